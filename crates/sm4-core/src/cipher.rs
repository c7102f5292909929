//! SM4 key schedule and the scalar reference block transform.

use crate::block::{load_words, store_reversed, Block};
use crate::key::{Direction, RoundKeys, Sm4Key, ROUNDS};
use crate::round::{key_function, round_function};

const FK: [u32; 4] = [0xa3b1_bac6, 0x56aa_3350, 0x677d_9197, 0xb270_22dc];

const CK: [u32; ROUNDS] = [
    0x0007_0e15, 0x1c23_2a31, 0x383f_464d, 0x545b_6269,
    0x7077_7e85, 0x8c93_9aa1, 0xa8af_b6bd, 0xc4cb_d2d9,
    0xe0e7_eef5, 0xfc03_0a11, 0x181f_262d, 0x343b_4249,
    0x5057_5e65, 0x6c73_7a81, 0x888f_969d, 0xa4ab_b2b9,
    0xc0c7_ced5, 0xdce3_eaf1, 0xf8ff_060d, 0x141b_2229,
    0x3037_3e45, 0x4c53_5a61, 0x686f_767d, 0x848b_9299,
    0xa0a7_aeb5, 0xbcc3_cad1, 0xd8df_e6ed, 0xf4fb_0209,
    0x1017_1e25, 0x2c33_3a41, 0x484f_565d, 0x646b_7279,
];

/// Expands a 128-bit key into 32 round subkeys.
pub fn expand_key(key: &Sm4Key) -> RoundKeys {
    let mk = load_words(&key.0);
    let mut k: [u32; 4] = core::array::from_fn(|i| mk[i] ^ FK[i]);
    let mut rk = [0u32; ROUNDS];

    for (i, slot) in rk.iter_mut().enumerate() {
        let next = k[0] ^ key_function(k[1] ^ k[2] ^ k[3] ^ CK[i]);
        k = [k[1], k[2], k[3], next];
        *slot = next;
    }

    RoundKeys(rk)
}

/// Runs the 32-round scalar transform, consuming subkeys in `direction` order.
pub fn crypt_block(block: &Block, round_keys: &RoundKeys, direction: Direction) -> Block {
    let mut x = load_words(block);
    for round in 0..ROUNDS {
        let rk = round_keys.subkey(direction, round);
        let next = x[0] ^ round_function(x[1] ^ x[2] ^ x[3] ^ rk);
        x = [x[1], x[2], x[3], next];
    }
    store_reversed(x)
}

/// Encrypts a single 16-byte block with pre-expanded round keys.
pub fn encrypt_block(block: &Block, round_keys: &RoundKeys) -> Block {
    crypt_block(block, round_keys, Direction::Encrypt)
}

/// Decrypts a single 16-byte block with pre-expanded round keys.
pub fn decrypt_block(block: &Block, round_keys: &RoundKeys) -> Block {
    crypt_block(block, round_keys, Direction::Decrypt)
}
