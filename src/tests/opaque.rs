// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::opaque;
use crate::tests::*;
use crate::Status;

use serial_test::parallel;

const KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";

#[cfg(feature = "cipher")]
#[test]
#[parallel]
fn test_opaque_cipher() {
    use crate::algorithm::CipherAlg;
    use crate::cipher::CipherOperation;

    let key = unhex(KEY);
    let attrs = opaque_attrs(aes_attrs(&key));
    let iv: Vec<u8> = (0..16).collect();
    let msg = test_message(5);

    let mut ct = [0u8; 16];
    let len = ret_or_panic!(opaque::cipher_encrypt(
        &attrs,
        &key,
        CipherAlg::CbcPkcs7,
        &iv,
        &msg,
        &mut ct
    ));
    assert_eq!(hex::encode(&ct[..len]), "c5dd5bfa779da6f450bb329e4e82aaa0");

    let mut input = iv.clone();
    input.extend_from_slice(&ct);
    let mut pt = [0u8; 16];
    let len = ret_or_panic!(opaque::cipher_decrypt(
        &attrs,
        &key,
        CipherAlg::CbcPkcs7,
        &input,
        &mut pt
    ));
    assert_eq!(&pt[..len], &msg[..]);

    let mut op = CipherOperation::new();
    ret_or_panic!(opaque::cipher_decrypt_setup(
        &mut op,
        &attrs,
        &key,
        CipherAlg::CbcPkcs7
    ));
    ret_or_panic!(op.set_iv(&iv));
    assert_eq!(ret_or_panic!(op.update(&ct, &mut pt)), 0);
    assert_eq!(ret_or_panic!(op.finish(&mut pt)), 5);
    assert_eq!(&pt[..5], &msg[..]);

    /* transparent keys are rejected */
    let local = aes_attrs(&key);
    assert_status(
        opaque::cipher_encrypt(
            &local,
            &key,
            CipherAlg::CbcPkcs7,
            &iv,
            &msg,
            &mut ct,
        ),
        Status::InvalidArgument,
    );
    let mut op = CipherOperation::new();
    assert_status(
        opaque::cipher_encrypt_setup(&mut op, &local, &key, CipherAlg::Ctr),
        Status::InvalidArgument,
    );
    assert!(!op.is_active());
}

#[cfg(feature = "aead")]
#[test]
#[parallel]
fn test_opaque_aead() {
    use crate::algorithm::AeadAlg;

    let key = unhex("c0c1c2c3c4c5c6c7c8c9cacbcccdcecf");
    let attrs = opaque_attrs(aes_attrs(&key));
    let nonce = unhex("00000003020100a0a1a2a3a4a5");
    let ad = unhex("0001020304050607");
    let pt = unhex("08090a0b0c0d0e0f101112131415161718191a1b1c1d1e");
    let alg = AeadAlg::ccm().with_tag_length(8);

    let mut out = [0u8; 31];
    let len = ret_or_panic!(opaque::aead_encrypt(
        &attrs, &key, alg, &nonce, &ad, &pt, &mut out
    ));
    assert_eq!(
        hex::encode(&out[..len]),
        "588c979a61c663d2f066d0c2c0f989806d5f6b61dac38417e8d12cfdf926e0"
    );
    let mut dec = [0u8; 23];
    let len = ret_or_panic!(opaque::aead_decrypt(
        &attrs, &key, alg, &nonce, &ad, &out, &mut dec
    ));
    assert_eq!(&dec[..len], &pt[..]);

    let local = aes_attrs(&key);
    assert_status(
        opaque::aead_decrypt(&local, &key, alg, &nonce, &ad, &out, &mut dec),
        Status::InvalidArgument,
    );
}

#[cfg(feature = "mac")]
#[test]
#[parallel]
fn test_opaque_mac() {
    use crate::algorithm::MacAlg;
    use crate::mac::MacOperation;

    let key = unhex(KEY);
    let attrs = opaque_attrs(aes_attrs(&key));
    let msg = test_message(40);
    let expected = unhex("e54a9f1335b8fbc47a6ebbbbf6c52e45");

    let mut mac = [0u8; 16];
    let len = ret_or_panic!(opaque::mac_compute(
        &attrs,
        &key,
        MacAlg::cmac(),
        &msg,
        &mut mac
    ));
    assert_eq!(&mac[..len], &expected[..]);

    let mut op = MacOperation::new();
    ret_or_panic!(opaque::mac_sign_setup(
        &mut op,
        &attrs,
        &key,
        MacAlg::cmac()
    ));
    ret_or_panic!(op.update(&msg));
    assert_eq!(ret_or_panic!(op.sign_finish(&mut mac)), 16);
    assert_eq!(&mac[..], &expected[..]);

    ret_or_panic!(opaque::mac_verify_setup(
        &mut op,
        &attrs,
        &key,
        MacAlg::cmac()
    ));
    ret_or_panic!(op.update(&msg));
    ret_or_panic!(op.verify_finish(&expected));

    let local = aes_attrs(&key);
    assert_status(
        opaque::mac_compute(&local, &key, MacAlg::cmac(), &msg, &mut mac),
        Status::InvalidArgument,
    );
    assert_status(
        opaque::mac_verify_setup(&mut op, &local, &key, MacAlg::cmac()),
        Status::InvalidArgument,
    );
}
