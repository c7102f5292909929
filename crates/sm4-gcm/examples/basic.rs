//! Seals a short message with SM4-GCM and opens it again.

use sm4_core::{encrypt_block, expand_key, Sm4Key};
use sm4_gcm::Sm4Gcm;

fn main() {
    let key = Sm4Key::from([
        0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32,
        0x10,
    ]);
    let block = encrypt_block(key.as_bytes(), &expand_key(&key));
    println!("block: {}", hex::encode(block));

    let gcm = Sm4Gcm::new(&key);
    let iv = [0x24u8; 12];
    let (ciphertext, tag) = gcm
        .encrypt(&iv, b"hello, sm4 demo!", b"header")
        .expect("12-byte IV");
    println!("ciphertext: {}", hex::encode(&ciphertext));
    println!("tag: {}", hex::encode(tag));

    let plaintext = gcm
        .decrypt(&iv, &ciphertext, b"header", tag.as_bytes())
        .expect("tag verifies");
    assert_eq!(plaintext, b"hello, sm4 demo!");
    println!("example succeeded; message authenticated");
}
