// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

use crate::hash::HashAlg;
use crate::mac::*;
use crate::*;

use hex;
use serial_test::parallel;

const CMAC_KEY: &str = "2b7e151628aed2a6abf7158809cf4f3c";

#[test]
#[parallel]
fn test_cmac_rfc4493() {
    let key = hex::decode(CMAC_KEY).unwrap();
    let msg = hex::decode(
        "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
         30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710",
    )
    .unwrap();

    for (len, expect) in [
        (0, "bb1d6929e95937287fa37d129b756746"),
        (16, "070a16b46b4d4144f79bdd9dd04a287c"),
        (40, "dfa66747de9ae63030ca32611497c827"),
        (64, "51f0bebf7e3b9d92fc49741779363cfe"),
    ] {
        let mut ctx = {
            let sel = select().unwrap();
            Mac::create_aescmac(&sel, &key).unwrap()
        };
        ctx.feed(&msg[..len]).unwrap();
        let mut out = [0u8; CMAC_SIZE];
        ctx.generate(&mut out).unwrap();
        ctx.wait().unwrap();
        assert_eq!(hex::encode(out), expect);
    }
}

#[test]
#[parallel]
fn test_cmac_save_resume() {
    let key = hex::decode(CMAC_KEY).unwrap();
    let msg = hex::decode(
        "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
         30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710",
    )
    .unwrap();

    let mut ctx = {
        let sel = select().unwrap();
        Mac::create_aescmac(&sel, &key).unwrap()
    };
    ctx.feed(&msg[..20]).unwrap();
    assert_eq!(
        ctx.save_state().unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );
    ctx.feed(&msg[20..32]).unwrap();
    ctx.save_state().unwrap();
    ctx.wait().unwrap();
    {
        let sel = select().unwrap();
        ctx.resume_state(&sel).unwrap();
    }
    ctx.feed(&msg[32..64]).unwrap();
    let mut out = [0u8; CMAC_SIZE];
    ctx.generate(&mut out).unwrap();
    ctx.wait().unwrap();
    assert_eq!(hex::encode(out), "51f0bebf7e3b9d92fc49741779363cfe");

    /* a saved context must keep a final block for generation */
    let mut ctx = {
        let sel = select().unwrap();
        Mac::create_aescmac(&sel, &key).unwrap()
    };
    ctx.feed(&msg[..16]).unwrap();
    ctx.save_state().unwrap();
    ctx.wait().unwrap();
    {
        let sel = select().unwrap();
        ctx.resume_state(&sel).unwrap();
    }
    assert_eq!(ctx.generate(&mut out).unwrap_err().kind(), ErrorKind::BadState);
}

#[test]
#[parallel]
fn test_hmac_single_shot() {
    let mut ctx = {
        let sel = select().unwrap();
        Mac::create_hmac(&sel, HashAlg::Sha256, b"Jefe").unwrap()
    };
    ctx.feed(b"what do ya ").unwrap();
    assert_eq!(ctx.save_state().unwrap_err().kind(), ErrorKind::NotSupported);
    ctx.feed(b"want for nothing?").unwrap();
    let mut out = [0u8; 32];
    ctx.generate(&mut out).unwrap();
    ctx.wait().unwrap();
    assert_eq!(
        hex::encode(out),
        "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
    );

    let sel = select().unwrap();
    assert_eq!(
        Mac::create_hmac(&sel, HashAlg::Sha256, &[0u8; 65])
            .unwrap_err()
            .kind(),
        ErrorKind::InvalidArgument
    );
}
