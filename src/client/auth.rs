// Copyright (C) 2026 the Vigil authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP-style authentication for RTSP: Basic and Digest
//! ([RFC 2617](https://datatracker.ietf.org/doc/html/rfc2617)), covering the
//! MD5 and MD5-sess algorithms and the empty/`auth`/`auth-int` qop values.

use rand::Rng;

use crate::Error;

/// A parsed `WWW-Authenticate` challenge bound to credentials, producing
/// `Authorization` values per request.
#[derive(Debug)]
pub struct Authenticator {
    scheme: Scheme,
    /// Request counter feeding the `nc` field; 8 hex digits on the wire.
    count: u32,
}

#[derive(Debug)]
enum Scheme {
    /// The value is constant for the whole session.
    Basic(String),
    Digest(DigestState),
}

#[derive(Debug)]
struct DigestState {
    username: String,
    realm: String,
    nonce: String,
    opaque: String,
    algorithm: String,
    qop: String,
    uri: String,
    /// MD5(username:realm:password), fixed per session for plain MD5.
    ha1: String,
}

impl Authenticator {
    /// Parses a challenge and binds credentials to it.
    ///
    /// `uri` is the request URI the digest covers. Unknown challenge
    /// parameters are ignored; an algorithm other than MD5/MD5-sess or a
    /// qop other than empty/`auth`/`auth-int` is rejected.
    pub fn new(
        uri: &str,
        challenge: &str,
        username: &str,
        password: &str,
    ) -> Result<Authenticator, Error> {
        let challenge = challenge.trim();
        if let Some(rest) = challenge.strip_prefix("Basic ") {
            // Realm is irrelevant for the computation; parse it anyway to
            // reject garbage.
            parse_params(rest)?;
            let token = base64::encode(format!("{}:{}", username, password));
            return Ok(Authenticator {
                scheme: Scheme::Basic(format!("Basic {}", token)),
                count: 0,
            });
        }
        let Some(rest) = challenge.strip_prefix("Digest ") else {
            return Err(Error::MalformedChallenge);
        };
        let params = parse_params(rest)?;
        let mut state = DigestState {
            username: username.to_owned(),
            realm: String::new(),
            nonce: String::new(),
            opaque: String::new(),
            algorithm: "MD5".to_owned(),
            qop: String::new(),
            uri: uri.to_owned(),
            ha1: String::new(),
        };
        for (key, value) in params {
            match key.as_str() {
                "realm" => state.realm = value,
                "nonce" => state.nonce = value,
                "opaque" => state.opaque = value,
                "algorithm" => state.algorithm = value,
                // Servers may offer a list; take the first offer.
                "qop" => {
                    state.qop = value
                        .split(',')
                        .next()
                        .unwrap_or("")
                        .trim()
                        .to_ascii_lowercase()
                }
                _ => {}
            }
        }
        if !state.algorithm.eq_ignore_ascii_case("MD5")
            && !state.algorithm.eq_ignore_ascii_case("MD5-sess")
        {
            return Err(Error::AuthNotImplemented(state.algorithm));
        }
        match state.qop.as_str() {
            "" | "auth" | "auth-int" => {}
            other => return Err(Error::AuthNotImplemented(other.to_owned())),
        }
        state.ha1 = md5_hex([username, state.realm.as_str(), password].join(":").as_bytes());
        Ok(Authenticator {
            scheme: Scheme::Digest(state),
            count: 0,
        })
    }

    /// Computes the `Authorization` header value for one request.
    pub fn authorization(&mut self, verb: &str, body: &[u8]) -> String {
        if let Scheme::Basic(value) = &self.scheme {
            return value.clone();
        }
        self.count += 1;
        let cnonce = new_cnonce();
        self.digest_authorization(verb, body, &cnonce)
    }

    fn digest_authorization(&self, verb: &str, body: &[u8], cnonce: &str) -> String {
        let Scheme::Digest(d) = &self.scheme else {
            unreachable!("digest_authorization on a Basic authenticator");
        };
        let ha2 = if d.qop == "auth-int" {
            md5_hex([verb, d.uri.as_str(), md5_hex(body).as_str()].join(":").as_bytes())
        } else {
            md5_hex([verb, d.uri.as_str()].join(":").as_bytes())
        };
        let mut out = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm=\"{}\"",
            d.username, d.realm, d.nonce, d.uri, d.algorithm,
        );
        if !d.opaque.is_empty() {
            out.push_str(&format!(", opaque=\"{}\"", d.opaque));
        }
        if d.qop.is_empty() {
            let response =
                md5_hex([d.ha1.as_str(), d.nonce.as_str(), ha2.as_str()].join(":").as_bytes());
            out.push_str(&format!(", response=\"{}\"", response));
        } else {
            let nc = format!("{:08x}", self.count);
            // MD5-sess folds the nonces into HA1 (RFC 2617 section 3.2.2.2).
            let ha1 = if d.algorithm.eq_ignore_ascii_case("MD5-sess") {
                md5_hex([d.ha1.as_str(), d.nonce.as_str(), cnonce].join(":").as_bytes())
            } else {
                d.ha1.clone()
            };
            let response = md5_hex(
                [
                    ha1.as_str(),
                    d.nonce.as_str(),
                    nc.as_str(),
                    cnonce,
                    d.qop.as_str(),
                    ha2.as_str(),
                ]
                .join(":")
                .as_bytes(),
            );
            out.push_str(&format!(
                ", qop={}, nc={}, cnonce=\"{}\", response=\"{}\"",
                d.qop, nc, cnonce, response,
            ));
        }
        out
    }
}

/// Parses comma-separated `key=value` challenge parameters; values may be
/// quoted, keys fold to lowercase. Tokens without `=` are skipped.
fn parse_params(challenge: &str) -> Result<Vec<(String, String)>, Error> {
    let mut params = Vec::new();
    for part in challenge.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        if key.is_empty() {
            return Err(Error::MalformedChallenge);
        }
        params.push((
            key.to_ascii_lowercase(),
            value.trim_matches('"').to_owned(),
        ));
    }
    Ok(params)
}

/// 16 hex characters of fresh randomness, regenerated per request.
fn new_cnonce() -> String {
    format!("{:016x}", rand::thread_rng().gen::<u64>())
}

fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}
