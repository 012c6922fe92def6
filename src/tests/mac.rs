// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::algorithm::{HashAlg, MacAlg};
use crate::key::{KeyAttributes, KeyType};
use crate::mac::{mac_compute, MacOperation, MAX_MAC_SIZE};
use crate::tests::*;
use crate::Status;

use serial_test::parallel;

const LONG_KEY_MSG: &[u8] =
    b"Test Using Larger Than Block-Size Key - Hash Key First";

/* key 00..13 over the first 100 bytes of the test message */
const HMAC_SHORT_KEY: [(HashAlg, &str); 5] = [
    (HashAlg::Sha1, "220e8f20a11ea966f929325bc1df19bca44d0cde"),
    (
        HashAlg::Sha224,
        "41bf2cf9db3e19594964b9558acad8e18de64f36fb5d46d29cb9630e",
    ),
    (
        HashAlg::Sha256,
        "1a03c94451d9f457db4b03f326da64c3479bc3b7698290122f087579c7c341d3",
    ),
    (
        HashAlg::Sha384,
        "aa5f65b28ab4a16778819fa1a6955c050feac0b429f28767\
         a98d06150a56e17bf0f702f7e8c6fc9f12895be02282999a",
    ),
    (
        HashAlg::Sha512,
        "01ef7c05d65b54808d977009550746fe5f50293a8033b8a12488ad1ce7f79394\
         fb91a631db506cd52ab9c1623b9f84cbf17fa49917d416f7a07c8a5cedca9743",
    ),
];

/* 200 byte key 00..c7, hashed before use */
const HMAC_LONG_KEY: [(HashAlg, &str); 5] = [
    (HashAlg::Sha1, "a9a92edb0e63dca07d8cc2321e1758465b190615"),
    (
        HashAlg::Sha224,
        "410a7ce708188ae55023b5df8079846e357f2cc916662253fd21fe32",
    ),
    (
        HashAlg::Sha256,
        "cb64ef6123af553f5ea64265b61f6adf6bbd95900922abd73efa07bbbef85d15",
    ),
    (
        HashAlg::Sha384,
        "4495c9325899784c485e24ebcebfa307f9537c4d75f327bf\
         76fe799193ab9c4b10e99b15ed25a2a27d9418d299205fbb",
    ),
    (
        HashAlg::Sha512,
        "41ed262e00535af1dbef29170dcb8c9737135e90369b857e0a25394f99647ff9\
         ebf0f061d17c77ff9251366adc75c8c132097590a5215b4f6175b83009d88555",
    ),
];

/* RFC 2202 and RFC 4231 test case 1, key 0x0b repeated 20 times */
const HMAC_RFC_CASE1: [(HashAlg, &str); 5] = [
    (HashAlg::Sha1, "b617318655057264e28bc0b6fb378c8ef146be00"),
    (
        HashAlg::Sha224,
        "896fb1128abbdf196832107cd49df33f47b4b1169912ba4f53684b22",
    ),
    (
        HashAlg::Sha256,
        "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7",
    ),
    (
        HashAlg::Sha384,
        "afd03944d84895626b0825f4ab46907f15f9dadbe4101ec6\
         82aa034c7cebc59cfaea9ea9076ede7f4af152e8b2fa9cb6",
    ),
    (
        HashAlg::Sha512,
        "87aa7cdea5ef619d4ff0b4241a1d6cb02379f4e2ce4ec2787ad0b30545e17cde\
         daa833b7d6b8a702038b274eaea3f4e4be9d914eeb61f1702e696c203a126854",
    ),
];

/* RFC 4231 test case 6, key 0xaa repeated 131 times */
const HMAC_RFC_CASE6: [(HashAlg, &str); 4] = [
    (
        HashAlg::Sha224,
        "95e9a0db962095adaebe9b2d6f0dbce2d499f112f2d2b7273fa6870e",
    ),
    (
        HashAlg::Sha256,
        "60e431591ee0b67f0d8a26aacbf5b77f8e0bc6213728c5140546040f0ee37f54",
    ),
    (
        HashAlg::Sha384,
        "4ece084485813e9088d2c63a041bc5b44f9ef1012a2b588f\
         3cd11f05033ac4c60c2ef6ab4030fe8296248df163f44952",
    ),
    (
        HashAlg::Sha512,
        "80b24263c7c1a3ebb71493c1dd7be8b49b46d1f41b4aeec1121b013783f8f352\
         6b56d037e05f2598bd0fd2215d6a1e5295e64f73f63f0aec8b915a985d786598",
    ),
];

const CMAC_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";

const CMAC_VECTORS: [(usize, &str); 4] = [
    (0, "bb1d6929e95937287fa37d129b756746"),
    (16, "5c7efb43900da87c2b8d87ee066d791b"),
    (40, "e54a9f1335b8fbc47a6ebbbbf6c52e45"),
    (64, "95e64c86f13f39a1e8015c2e920159ea"),
];

const SPLITS: [&[usize]; 5] =
    [&[], &[1, 15, 16], &[16, 16, 16], &[5, 0, 27], &[63, 1, 64]];

fn sign_multipart(
    attrs: &KeyAttributes,
    key: &[u8],
    alg: MacAlg,
    data: &[u8],
    pattern: &[usize],
) -> Result<Vec<u8>> {
    let mut op = MacOperation::new();
    op.sign_setup(attrs, key, alg)?;
    for part in split_pattern(data, pattern) {
        op.update(part)?;
    }
    let mut mac = [0u8; MAX_MAC_SIZE];
    let len = op.sign_finish(&mut mac)?;
    Ok(mac[..len].to_vec())
}

fn check_mac(
    attrs: &KeyAttributes,
    key: &[u8],
    alg: MacAlg,
    data: &[u8],
    expected: &str,
) {
    let mut mac = [0u8; MAX_MAC_SIZE];
    let len = ret_or_panic!(mac_compute(attrs, key, alg, data, &mut mac));
    assert_eq!(hex::encode(&mac[..len]), expected, "{:?}", alg);

    for pattern in SPLITS {
        let mac = ret_or_panic!(sign_multipart(attrs, key, alg, data, pattern));
        assert_eq!(hex::encode(&mac), expected, "{:?} {:?}", alg, pattern);
    }

    let mut op = MacOperation::new();
    ret_or_panic!(op.verify_setup(attrs, key, alg));
    ret_or_panic!(op.update(data));
    ret_or_panic!(op.verify_finish(&unhex(expected)));
}

#[test]
#[parallel]
fn test_hmac_vectors() {
    let msg = test_message(100);
    let key: Vec<u8> = (0..20).collect();
    let attrs = hmac_attrs(&key);
    for (hash, expected) in HMAC_SHORT_KEY {
        check_mac(&attrs, &key, MacAlg::hmac(hash), &msg, expected);
    }

    let key: Vec<u8> = (0..200).collect();
    let attrs = hmac_attrs(&key);
    for (hash, expected) in HMAC_LONG_KEY {
        check_mac(&attrs, &key, MacAlg::hmac(hash), LONG_KEY_MSG, expected);
    }
}

#[test]
#[parallel]
fn test_hmac_rfc_vectors() {
    let key = [0x0bu8; 20];
    let attrs = hmac_attrs(&key);
    for (hash, expected) in HMAC_RFC_CASE1 {
        check_mac(&attrs, &key, MacAlg::hmac(hash), b"Hi There", expected);
    }

    let key = [0xaau8; 131];
    let attrs = hmac_attrs(&key);
    for (hash, expected) in HMAC_RFC_CASE6 {
        check_mac(&attrs, &key, MacAlg::hmac(hash), LONG_KEY_MSG, expected);
    }

    /* RFC 2202 test case 6 */
    let key = [0xaau8; 80];
    let attrs = hmac_attrs(&key);
    check_mac(
        &attrs,
        &key,
        MacAlg::hmac(HashAlg::Sha1),
        LONG_KEY_MSG,
        "aa4ae5e15272d00e95705637ce8a3b55ed402112",
    );
}

#[test]
#[parallel]
fn test_cmac_vectors() {
    let key = unhex(CMAC_KEY);
    let attrs = aes_attrs(&key);
    let msg = test_message(64);
    for (n, expected) in CMAC_VECTORS {
        check_mac(&attrs, &key, MacAlg::cmac(), &msg[..n], expected);
    }

    let key: Vec<u8> = (0..32).collect();
    let attrs = aes_attrs(&key);
    check_mac(
        &attrs,
        &key,
        MacAlg::cmac(),
        &test_message(37),
        "278b762527172ab581d983ff201f20b8",
    );
}

#[test]
#[parallel]
fn test_cmac_last_block() {
    let key = unhex(CMAC_KEY);
    let attrs = aes_attrs(&key);
    let msg = test_message(48);
    let whole = ret_or_panic!(sign_multipart(
        &attrs,
        &key,
        MacAlg::cmac(),
        &msg,
        &[]
    ));
    let blocks = ret_or_panic!(sign_multipart(
        &attrs,
        &key,
        MacAlg::cmac(),
        &msg,
        &[16, 16, 16]
    ));
    assert_eq!(whole, blocks);

    let mut longer = msg.clone();
    longer.push(0);
    let padded = ret_or_panic!(sign_multipart(
        &attrs,
        &key,
        MacAlg::cmac(),
        &longer,
        &[16, 16, 16]
    ));
    assert_ne!(whole, padded);
}

#[test]
#[parallel]
fn test_mac_truncation() {
    let key = unhex(CMAC_KEY);
    let attrs = aes_attrs(&key);
    let msg = test_message(40);
    let alg = MacAlg::cmac().truncated(8);
    check_mac(&attrs, &key, alg, &msg, "e54a9f1335b8fbc4");

    let key: Vec<u8> = (0..20).collect();
    let attrs = hmac_attrs(&key);
    let alg = MacAlg::hmac(HashAlg::Sha256).truncated(10);
    check_mac(&attrs, &key, alg, &test_message(100), "1a03c94451d9f457db4b");

    /* longer than the MAC itself */
    let mut mac = [0u8; MAX_MAC_SIZE];
    let alg = MacAlg::hmac(HashAlg::Sha1).truncated(21);
    assert_status(
        mac_compute(&attrs, &key, alg, b"abc", &mut mac),
        Status::InvalidArgument,
    );
    let mut op = MacOperation::new();
    assert_status(op.sign_setup(&attrs, &key, alg), Status::InvalidArgument);
    assert!(!op.is_active());
}

#[test]
#[parallel]
fn test_mac_verify_failures() {
    let key = unhex(CMAC_KEY);
    let attrs = aes_attrs(&key);
    let msg = test_message(40);
    let good = unhex("e54a9f1335b8fbc47a6ebbbbf6c52e45");

    let mut bad = good.clone();
    bad[15] ^= 0x01;
    let mut op = MacOperation::new();
    ret_or_panic!(op.verify_setup(&attrs, &key, MacAlg::cmac()));
    ret_or_panic!(op.update(&msg));
    assert_status(op.verify_finish(&bad), Status::InvalidSignature);
    assert!(!op.is_active());

    /* a prefix of the right MAC is not accepted */
    ret_or_panic!(op.verify_setup(&attrs, &key, MacAlg::cmac()));
    ret_or_panic!(op.update(&msg));
    assert_status(op.verify_finish(&good[..8]), Status::InvalidSignature);

    /* neither is a longer one */
    let mut long = good.clone();
    long.push(0);
    ret_or_panic!(op.verify_setup(&attrs, &key, MacAlg::cmac()));
    ret_or_panic!(op.update(&msg));
    assert_status(op.verify_finish(&long), Status::InvalidSignature);
}

#[test]
#[parallel]
fn test_mac_lifecycle() {
    let key = unhex(CMAC_KEY);
    let attrs = aes_attrs(&key);
    let mut mac = [0u8; 16];

    let mut op = MacOperation::new();
    assert_status(op.update(b"abc"), Status::BadState);
    assert_status(op.sign_finish(&mut mac), Status::BadState);
    assert_status(op.verify_finish(&mac), Status::BadState);

    ret_or_panic!(op.sign_setup(&attrs, &key, MacAlg::cmac()));
    assert_status(
        op.sign_setup(&attrs, &key, MacAlg::cmac()),
        Status::BadState,
    );
    ret_or_panic!(op.update(b"abc"));
    /* a short buffer still ends the operation */
    assert_status(op.sign_finish(&mut mac[..15]), Status::BufferTooSmall);
    assert!(!op.is_active());

    ret_or_panic!(op.sign_setup(&attrs, &key, MacAlg::cmac()));
    op.abort();
    op.abort();
    assert_status(op.update(b"abc"), Status::BadState);
}

#[test]
#[parallel]
fn test_mac_key_errors() {
    let aes_key = unhex(CMAC_KEY);
    let aes = aes_attrs(&aes_key);
    let hmac = hmac_attrs(&aes_key);
    let mut mac = [0u8; MAX_MAC_SIZE];
    let mut op = MacOperation::new();

    /* HMAC requires an HMAC key */
    let sha256 = MacAlg::hmac(HashAlg::Sha256);
    assert_status(
        mac_compute(&aes, &aes_key, sha256, b"abc", &mut mac),
        Status::InvalidArgument,
    );
    assert_status(
        op.sign_setup(&aes, &aes_key, sha256),
        Status::InvalidArgument,
    );

    /* CMAC is only computed with AES */
    assert_status(
        mac_compute(&hmac, &aes_key, MacAlg::cmac(), b"abc", &mut mac),
        Status::NotSupported,
    );
    assert_status(
        op.sign_setup(&hmac, &aes_key, MacAlg::cmac()),
        Status::NotSupported,
    );
    let des = KeyAttributes::new(KeyType::Des, 64);
    assert_status(
        op.sign_setup(&des, &aes_key, MacAlg::cmac()),
        Status::NotSupported,
    );
    let odd = KeyAttributes::new(KeyType::Aes, 120);
    assert_status(
        mac_compute(&odd, &aes_key, MacAlg::cmac(), b"abc", &mut mac),
        Status::InvalidArgument,
    );

    /* hashes the accelerator does not provide */
    let sha3 = MacAlg::hmac(HashAlg::Sha3_256);
    assert_status(
        mac_compute(&hmac, &aes_key, sha3, b"abc", &mut mac),
        Status::NotSupported,
    );
    assert_status(
        op.sign_setup(&hmac, &aes_key, sha3),
        Status::NotSupported,
    );
    assert!(!op.is_active());

    /* output too small */
    assert_status(
        mac_compute(&hmac, &aes_key, sha256, b"abc", &mut mac[..31]),
        Status::BufferTooSmall,
    );
}
