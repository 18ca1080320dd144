// dub-rs: a package-aware build orchestrator for the D language.
// Copyright (C) 2026 The dub-rs contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Canonical digesting of build inputs. MD5 is used for stability and
//! change detection, not cryptographic strength.

/// Incremental digest with an unambiguous framing: every scalar is followed
/// by a NUL separator, a list ends with two NULs.
pub struct SettingsDigest {
    ctx: md5::Context,
}

impl Default for SettingsDigest {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsDigest {
    pub fn new() -> SettingsDigest {
        SettingsDigest {
            ctx: md5::Context::new(),
        }
    }

    pub fn add(&mut self, value: &str) {
        self.ctx.consume(value.as_bytes());
        self.ctx.consume([0u8]);
    }

    pub fn add_list<S: AsRef<str>>(&mut self, values: &[S]) {
        for v in values {
            self.add(v.as_ref());
        }
        self.ctx.consume([0u8]);
    }

    pub fn add_u32_le(&mut self, value: u32) {
        self.ctx.consume(value.to_le_bytes());
        self.ctx.consume([0u8]);
    }

    /// Finishes the digest as uppercase hex.
    pub fn hex_digest(self) -> String {
        let digest = self.ctx.compute();
        digest.0.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable() {
        let mut a = SettingsDigest::new();
        a.add_list(&["x", "y"]);
        a.add("opt");
        let mut b = SettingsDigest::new();
        b.add_list(&["x", "y"]);
        b.add("opt");
        assert_eq!(a.hex_digest(), b.hex_digest());
    }

    #[test]
    fn list_framing_distinguishes_boundaries() {
        // ["ab"] vs ["a", "b"] must not collide
        let mut a = SettingsDigest::new();
        a.add_list(&["ab"]);
        let mut b = SettingsDigest::new();
        b.add_list(&["a", "b"]);
        assert_ne!(a.hex_digest(), b.hex_digest());

        // [] ++ ["x"] vs ["x"] ++ []
        let mut c = SettingsDigest::new();
        c.add_list::<&str>(&[]);
        c.add_list(&["x"]);
        let mut d = SettingsDigest::new();
        d.add_list(&["x"]);
        d.add_list::<&str>(&[]);
        assert_ne!(c.hex_digest(), d.hex_digest());
    }

    #[test]
    fn digest_is_uppercase_hex() {
        let mut d = SettingsDigest::new();
        d.add("input");
        let hex = d.hex_digest();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
