// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::aead::{aead_decrypt, aead_encrypt, AeadOperation};
use crate::algorithm::AeadAlg;
use crate::config::{self, Options};
use crate::tests::*;
use crate::Status;

use aes_gcm::aead::consts::{U16, U8};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead as _, KeyInit, Payload};
use aes_gcm::aes::Aes128;
use aes_gcm::AesGcm;
use serial_test::{parallel, serial};

const KEY: &str = "feffe9928665731c6d6a8f9467308308";
const AD: &str = "feedfacedeadbeeffeedfacedeadbeefabaddad2";
const PT: &str = "d9313225f88406e5a55909c5aff5269a\
                  86a7a9531534f7da2e4c303d8a318a72\
                  1c3c0c95956809532fcf0e2449a6b525\
                  b16aedf5aa0de657ba637b39";
/* 60 byte IV */
const LONG_IV: &str = "9313225df88406e555909c5aff5269aa\
                       6a7a9538534f7da1e4c303d2a318a728\
                       c3c0c95156809539fcf0e2429a6b5254\
                       16aedbf5a0de6a57a637b39b";

struct SoftVector {
    key: &'static str,
    nonce: &'static str,
    ad: &'static str,
    plaintext: &'static str,
    output: &'static str,
}

const VECTORS: [SoftVector; 3] = [
    SoftVector {
        key: KEY,
        nonce: LONG_IV,
        ad: AD,
        plaintext: PT,
        output: "8ce24998625615b603a033aca13fb894\
                 be9112a5c3a211a8ba262a3cca7e2ca7\
                 01e4a9a4fba43c90ccdcb281d48c7c6f\
                 d62875d2aca417034c34aee5\
                 619cc5aefffe0bfa462af43c1699d050",
    },
    SoftVector {
        key: "000102030405060708090a0b0c0d0e0f",
        nonce: "0001020304050607",
        ad: "000102030405060708090a0b0c0d0e0f10111213",
        plaintext: "000102030405060708090a0b0c0d0e0f\
                    101112131415161718191a1b1c1d1e1f\
                    2021222324252627",
        output: "c74a2d76f6d3544bbff1c7eea93f4283\
                 7a013b020359fb7145a79c8672ea8a6e\
                 4eb4119359baef19\
                 57ccc0a808bfaaea1c5629ae6c36f9e7",
    },
    SoftVector {
        key: "000102030405060708090a0b0c0d0e0f",
        nonce: "0001020304050607",
        ad: "",
        plaintext: "",
        output: "6aa0abada8077f482f8497283a2499da",
    },
];

#[test]
#[parallel]
fn test_software_gcm_vectors() {
    for v in &VECTORS {
        let key = unhex(v.key);
        let attrs = aes_attrs(&key);
        let nonce = unhex(v.nonce);
        let ad = unhex(v.ad);
        let pt = unhex(v.plaintext);
        let expected = unhex(v.output);

        let mut out = vec![0u8; expected.len()];
        let len = ret_or_panic!(aead_encrypt(
            &attrs,
            &key,
            AeadAlg::gcm(),
            &nonce,
            &ad,
            &pt,
            &mut out
        ));
        assert_eq!(len, expected.len());
        assert_eq!(hex::encode(&out), hex::encode(&expected));

        let mut dec = vec![0u8; pt.len()];
        let len = ret_or_panic!(aead_decrypt(
            &attrs,
            &key,
            AeadAlg::gcm(),
            &nonce,
            &ad,
            &expected,
            &mut dec
        ));
        assert_eq!(len, pt.len());
        assert_eq!(dec, pt);
    }
}

#[test]
#[parallel]
fn test_software_gcm_truncated_tag() {
    let v = &VECTORS[0];
    let key = unhex(v.key);
    let attrs = aes_attrs(&key);
    let nonce = unhex(v.nonce);
    let ad = unhex(v.ad);
    let pt = unhex(v.plaintext);
    let full = unhex(v.output);

    let alg = AeadAlg::gcm().with_tag_length(8);
    let mut out = vec![0u8; pt.len() + 8];
    ret_or_panic!(aead_encrypt(&attrs, &key, alg, &nonce, &ad, &pt, &mut out));
    assert_eq!(&out[..], &full[..pt.len() + 8]);

    let mut dec = vec![0u8; pt.len()];
    ret_or_panic!(aead_decrypt(&attrs, &key, alg, &nonce, &ad, &out, &mut dec));
    assert_eq!(dec, pt);
}

#[test]
#[parallel]
fn test_software_gcm_bad_tag() {
    let v = &VECTORS[1];
    let key = unhex(v.key);
    let attrs = aes_attrs(&key);
    let nonce = unhex(v.nonce);
    let ad = unhex(v.ad);
    let mut input = unhex(v.output);
    input[3] ^= 0x80;

    let mut dec = vec![0x55u8; input.len()];
    assert_status(
        aead_decrypt(
            &attrs,
            &key,
            AeadAlg::gcm(),
            &nonce,
            &ad,
            &input,
            &mut dec,
        ),
        Status::InvalidSignature,
    );
    let ct_len = input.len() - 16;
    assert!(dec[..ct_len].iter().all(|b| *b == 0));
}

#[test]
#[parallel]
fn test_software_gcm_reference() {
    let key = test_message(16);
    let attrs = aes_attrs(&key);
    let nonce = test_message(8);
    let reference = ret_or_panic!(AesGcm::<Aes128, U8, U16>::new_from_slice(
        &key
    ));
    let sizes = [0, 1, 15, 16, 17, 100, 4096];
    let mixed = [(3, 17), (29, 100)];
    let pairs = sizes.iter().map(|n| (*n, *n)).chain(mixed);
    for (ad_len, pt_len) in pairs {
        let ad = test_message(ad_len);
        let pt: Vec<u8> = test_message(pt_len).iter().rev().cloned().collect();
        let expected = ret_or_panic!(reference.encrypt(
            GenericArray::from_slice(&nonce),
            Payload {
                msg: &pt,
                aad: &ad,
            }
        ));
        let mut out = vec![0u8; pt_len + 16];
        ret_or_panic!(aead_encrypt(
            &attrs,
            &key,
            AeadAlg::gcm(),
            &nonce,
            &ad,
            &pt,
            &mut out
        ));
        assert_eq!(out, expected, "{} {}", ad_len, pt_len);

        let mut dec = vec![0u8; pt_len];
        let len = ret_or_panic!(aead_decrypt(
            &attrs,
            &key,
            AeadAlg::gcm(),
            &nonce,
            &ad,
            &out,
            &mut dec
        ));
        assert_eq!(len, pt_len);
        assert_eq!(dec, pt);
    }
}

#[test]
#[parallel]
fn test_software_gcm_one_shot_only() {
    let key = unhex(KEY);
    let attrs = aes_attrs(&key);
    let mut op = AeadOperation::new();
    ret_or_panic!(op.encrypt_setup(&attrs, &key, AeadAlg::gcm()));
    assert_status(op.set_nonce(&unhex(LONG_IV)), Status::NotSupported);
}

#[test]
#[serial]
fn test_software_gcm_disabled() {
    let v = &VECTORS[1];
    let key = unhex(v.key);
    let attrs = aes_attrs(&key);
    let nonce = unhex(v.nonce);
    let mut out = [0u8; 64];

    ret_or_panic!(config::set_options(Options {
        software_gcm: false
    }));
    let ret = aead_encrypt(
        &attrs,
        &key,
        AeadAlg::gcm(),
        &nonce,
        &[],
        b"abc",
        &mut out,
    );
    ret_or_panic!(config::set_options(Options::default()));
    assert_status(ret, Status::NotSupported);
}
