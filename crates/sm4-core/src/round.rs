//! SM4 linear transforms and the composite round functions.
//!
//! Two different linear layers exist: [`l_round`] diffuses the cipher state and
//! [`l_key`] is used only by the key schedule. Mixing them up yields a
//! different, incompatible cipher.

use crate::sbox::tau;

/// Round diffusion `L(x) = x ^ (x <<< 2) ^ (x <<< 10) ^ (x <<< 18) ^ (x <<< 24)`.
#[inline]
pub fn l_round(x: u32) -> u32 {
    x ^ x.rotate_left(2) ^ x.rotate_left(10) ^ x.rotate_left(18) ^ x.rotate_left(24)
}

/// Key-schedule diffusion `L'(x) = x ^ (x <<< 13) ^ (x <<< 23)`.
#[inline]
pub fn l_key(x: u32) -> u32 {
    x ^ x.rotate_left(13) ^ x.rotate_left(23)
}

/// Cipher round transform `T(x) = L(τ(x))`, computed from the S-box directly.
#[inline]
pub fn round_function(x: u32) -> u32 {
    l_round(tau(x))
}

/// Key-schedule transform `T'(x) = L'(τ(x))`.
#[inline]
pub fn key_function(x: u32) -> u32 {
    l_key(tau(x))
}
