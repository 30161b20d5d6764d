// {{{ Copyright (c) Paul R. Tagliamonte <paultag@debian.org>, 2024
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE. }}}

//! Reading Crypt4GH's ASCII-armored key files. Private keys are wrapped
//! with a passphrase-derived ChaCha20-Poly1305 key; the passphrase is read
//! from `C4GH_PASSPHRASE` first, falling back to an interactive prompt.

use crate::errors::CryptoError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, Key, KeyInit, Nonce};
use sha2::{Digest as _, Sha256};
use std::io::Write;
use std::path::Path;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

const PUBLIC_HEADER: &str = "-----BEGIN CRYPT4GH PUBLIC KEY-----";
const PUBLIC_FOOTER: &str = "-----END CRYPT4GH PUBLIC KEY-----";
const PRIVATE_HEADER: &str = "-----BEGIN CRYPT4GH PRIVATE KEY-----";
const PRIVATE_FOOTER: &str = "-----END CRYPT4GH PRIVATE KEY-----";

const ENV_PASSPHRASE: &str = "C4GH_PASSPHRASE";

fn armor(header: &str, footer: &str, body: &[u8]) -> String {
    format!("{}\n{}\n{}\n", header, BASE64.encode(body), footer)
}

fn dearmor(header: &str, footer: &str, contents: &str) -> Result<Vec<u8>, CryptoError> {
    let body: String = contents
        .lines()
        .filter(|l| *l != header && *l != footer && !l.trim().is_empty())
        .collect();
    BASE64
        .decode(body.trim())
        .map_err(|_| CryptoError::BadHeader)
}

fn passphrase_key(passphrase: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(Sha256::digest(passphrase.as_bytes()).into())
}

/// Read a public key file and return the raw X25519 public key.
pub fn read_public_key(path: &Path) -> Result<PublicKey, CryptoError> {
    let contents =
        std::fs::read_to_string(path).map_err(|_| CryptoError::KeyFileMissing(path.to_owned()))?;
    let bytes = dearmor(PUBLIC_HEADER, PUBLIC_FOOTER, &contents)?;
    let bytes: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::BadHeader)?;
    Ok(PublicKey::from(bytes))
}

/// Write a public key file.
pub fn write_public_key(path: &Path, public_key: &PublicKey) -> std::io::Result<()> {
    let mut f = std::fs::File::create(path)?;
    f.write_all(armor(PUBLIC_HEADER, PUBLIC_FOOTER, public_key.as_bytes()).as_bytes())
}

/// Resolve the passphrase protecting a private key: `C4GH_PASSPHRASE` first,
/// an interactive prompt otherwise.
pub fn resolve_passphrase() -> Result<Zeroizing<String>, CryptoError> {
    if let Ok(p) = std::env::var(ENV_PASSPHRASE) {
        return Ok(Zeroizing::new(p));
    }
    rpassword_prompt().ok_or(CryptoError::BadPassphrase)
}

#[cfg(not(test))]
fn rpassword_prompt() -> Option<Zeroizing<String>> {
    use std::io::IsTerminal;
    if !std::io::stdin().is_terminal() {
        return None;
    }
    eprint!("Enter Crypt4GH private key passphrase: ");
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).ok()?;
    Some(Zeroizing::new(line.trim_end().to_owned()))
}

#[cfg(test)]
fn rpassword_prompt() -> Option<Zeroizing<String>> {
    None
}

/// Read a private key file, decrypting it with the resolved passphrase.
pub fn read_private_key(path: &Path, passphrase: &str) -> Result<StaticSecret, CryptoError> {
    let contents =
        std::fs::read_to_string(path).map_err(|_| CryptoError::KeyFileMissing(path.to_owned()))?;
    let wrapped = dearmor(PRIVATE_HEADER, PRIVATE_FOOTER, &contents)?;
    if wrapped.len() < 12 + 16 {
        return Err(CryptoError::BadHeader);
    }
    let (nonce, ciphertext) = wrapped.split_at(12);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&*passphrase_key(passphrase)));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::BadPassphrase)?;
    let bytes: [u8; 32] = plaintext.try_into().map_err(|_| CryptoError::BadHeader)?;
    Ok(StaticSecret::from(bytes))
}

/// Write a private key file, encrypted under `passphrase`.
pub fn write_private_key(
    path: &Path,
    secret_key: &StaticSecret,
    passphrase: &str,
) -> Result<(), CryptoError> {
    let mut nonce = [0u8; 12];
    rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&*passphrase_key(passphrase)));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), secret_key.to_bytes().as_slice())
        .map_err(|_| CryptoError::BadHeader)?;
    let mut wrapped = nonce.to_vec();
    wrapped.extend_from_slice(&ciphertext);
    let mut f =
        std::fs::File::create(path).map_err(|_| CryptoError::KeyFileMissing(path.to_owned()))?;
    f.write_all(armor(PRIVATE_HEADER, PRIVATE_FOOTER, &wrapped).as_bytes())
        .map_err(|_| CryptoError::KeyFileMissing(path.to_owned()))
}


// vim: foldmethod=marker
