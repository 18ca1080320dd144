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

//! Platform-aware path values with three on-disk/wire formats.
//!
//! A [`TypedPath`] is a list of segments plus a root. The same value can be
//! re-rendered in another format as long as every segment is representable
//! there; conversion re-validates and fails with [`PathValidationError`]
//! otherwise.

use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFormat {
    Posix,
    Windows,
    Inet,
}

impl PathFormat {
    pub fn native() -> PathFormat {
        if cfg!(windows) {
            PathFormat::Windows
        } else {
            PathFormat::Posix
        }
    }

    fn separator(self) -> char {
        match self {
            PathFormat::Windows => '\\',
            PathFormat::Posix | PathFormat::Inet => '/',
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("segment `{segment}` contains `{ch}`, not representable in a {format:?} path")]
    InvalidChar {
        segment: String,
        ch: char,
        format: PathFormat,
    },
    #[error("normalizing `{0}` would ascend above the path root")]
    EscapesRoot(String),
    #[error("UNC path `{0}` is missing its host or share segment")]
    IncompleteUnc(String),
    #[error("`{0}` is not an absolute path")]
    NotAbsolute(String),
    #[error("invalid percent encoding in segment `{0}`")]
    BadPercentEncoding(String),
}

/// The absolute-root of a path, if any. A Windows UNC root carries its
/// host and share atomically so that `relative_to` can never split them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    Relative,
    /// `/...` on POSIX/Inet, `\...` (current drive) on Windows.
    Slash,
    /// `c:\...`; the stored string includes the colon, original case.
    Drive(String),
    /// `\\host\share\...`.
    Unc(String, String),
}

impl PathRoot {
    fn same_windows_root(&self, other: &PathRoot) -> bool {
        match (self, other) {
            (PathRoot::Slash, PathRoot::Slash) => true,
            (PathRoot::Drive(a), PathRoot::Drive(b)) => a.eq_ignore_ascii_case(b),
            (PathRoot::Unc(ah, as_), PathRoot::Unc(bh, bs)) => {
                ah.eq_ignore_ascii_case(bh) && as_.eq_ignore_ascii_case(bs)
            }
            _ => false,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct TypedPath {
    format: PathFormat,
    root: PathRoot,
    segments: Vec<String>,
    trailing_slash: bool,
}

impl Debug for TypedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.format, self)
    }
}

impl fmt::Display for TypedPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(false))
    }
}

fn validate_segment(segment: &str, format: PathFormat) -> Result<(), PathValidationError> {
    let forbidden: &[char] = match format {
        PathFormat::Posix => &['\0'],
        PathFormat::Windows => &['\0', '<', '>', ':', '"', '|', '?', '*', '/', '\\'],
        // Inet segments are stored decoded; any character can be
        // percent-encoded on rendering.
        PathFormat::Inet => &['\0'],
    };
    if let Some(ch) = segment.chars().find(|c| forbidden.contains(c)) {
        return Err(PathValidationError::InvalidChar {
            segment: segment.into(),
            ch,
            format,
        });
    }
    Ok(())
}

// RFC 3986 pchar minus pct-encoded: unreserved / sub-delims / ":" / "@"
fn is_unencoded_inet_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.' | '_' | '~' | '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';'
                | '=' | ':' | '@'
        )
}

pub fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for b in segment.bytes() {
        if b.is_ascii() && is_unencoded_inet_char(b as char) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}

pub fn decode_segment(segment: &str) -> Result<String, PathValidationError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| PathValidationError::BadPercentEncoding(segment.into()))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| PathValidationError::BadPercentEncoding(segment.into()))
}

impl TypedPath {
    pub fn parse(s: &str, format: PathFormat) -> Result<TypedPath, PathValidationError> {
        match format {
            PathFormat::Posix => Self::parse_slash(s, PathFormat::Posix),
            PathFormat::Inet => {
                let raw = Self::parse_slash(s, PathFormat::Inet)?;
                let segments = raw
                    .segments
                    .iter()
                    .map(|seg| decode_segment(seg))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TypedPath { segments, ..raw })
            }
            PathFormat::Windows => Self::parse_windows(s),
        }
    }

    pub fn native(s: &str) -> Result<TypedPath, PathValidationError> {
        Self::parse(s, PathFormat::native())
    }

    fn parse_slash(s: &str, format: PathFormat) -> Result<TypedPath, PathValidationError> {
        let root = if s.starts_with('/') {
            PathRoot::Slash
        } else {
            PathRoot::Relative
        };
        let mut segments = Vec::new();
        for seg in s.split('/') {
            if seg.is_empty() {
                continue;
            }
            validate_segment(seg, format)?;
            segments.push(seg.to_string());
        }
        let trailing_slash = !segments.is_empty() && s.ends_with('/');
        Ok(TypedPath {
            format,
            root,
            segments,
            trailing_slash,
        })
    }

    fn parse_windows(s: &str) -> Result<TypedPath, PathValidationError> {
        let norm = s.replace('/', "\\");
        let (root, rest) = if let Some(unc) = norm.strip_prefix("\\\\") {
            let mut it = unc.splitn(3, '\\');
            let host = it.next().unwrap_or("");
            let share = it.next().unwrap_or("");
            if host.is_empty() || share.is_empty() {
                return Err(PathValidationError::IncompleteUnc(s.into()));
            }
            (
                PathRoot::Unc(host.to_string(), share.to_string()),
                it.next().unwrap_or("").to_string(),
            )
        } else if norm.len() >= 2
            && norm.as_bytes()[1] == b':'
            && norm.as_bytes()[0].is_ascii_alphabetic()
        {
            (PathRoot::Drive(norm[..2].to_string()), norm[2..].to_string())
        } else if let Some(stripped) = norm.strip_prefix('\\') {
            (PathRoot::Slash, stripped.to_string())
        } else {
            (PathRoot::Relative, norm)
        };

        let mut segments = Vec::new();
        for seg in rest.split('\\') {
            if seg.is_empty() {
                continue;
            }
            validate_segment(seg, PathFormat::Windows)?;
            segments.push(seg.to_string());
        }
        let trailing_slash = !segments.is_empty() && rest.ends_with('\\');
        Ok(TypedPath {
            format: PathFormat::Windows,
            root,
            segments,
            trailing_slash,
        })
    }

    pub fn format(&self) -> PathFormat {
        self.format
    }

    pub fn is_absolute(&self) -> bool {
        self.root != PathRoot::Relative
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && !self.is_absolute()
    }

    pub fn ends_with_slash(&self) -> bool {
        self.trailing_slash
    }

    pub fn root(&self) -> &PathRoot {
        &self.root
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn front(&self) -> Option<&str> {
        self.segments.first().map(|s| s.as_str())
    }

    pub fn back(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// Collapses `.` and `..` segments. Fails when an absolute path would
    /// ascend above its root; a relative path keeps leading `..`s.
    pub fn normalized(&self) -> Result<TypedPath, PathValidationError> {
        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg.as_str() {
                "." => {}
                ".." => {
                    if out.last().is_some_and(|l| l != "..") {
                        out.pop();
                    } else if self.is_absolute() {
                        return Err(PathValidationError::EscapesRoot(self.to_string()));
                    } else {
                        out.push("..".into());
                    }
                }
                _ => out.push(seg.clone()),
            }
        }
        Ok(TypedPath {
            format: self.format,
            root: self.root.clone(),
            trailing_slash: self.trailing_slash && !out.is_empty(),
            segments: out,
        })
    }

    /// Computes `self` relative to `base`. Both must be absolute. On
    /// Windows, crossing drive letters or UNC hosts is refused and `self`
    /// is returned unchanged.
    pub fn relative_to(&self, base: &TypedPath) -> Result<TypedPath, PathValidationError> {
        if !self.is_absolute() {
            return Err(PathValidationError::NotAbsolute(self.to_string()));
        }
        if !base.is_absolute() {
            return Err(PathValidationError::NotAbsolute(base.to_string()));
        }
        if self.format == PathFormat::Windows && !self.root.same_windows_root(&base.root) {
            return Ok(self.clone());
        }

        let a = self.normalized()?;
        let b = base.normalized()?;
        let common = a
            .segments
            .iter()
            .zip(b.segments.iter())
            .take_while(|(x, y)| x == y)
            .count();

        let mut segments: Vec<String> = std::iter::repeat("..".to_string())
            .take(b.segments.len() - common)
            .collect();
        segments.extend(a.segments[common..].iter().cloned());
        Ok(TypedPath {
            format: self.format,
            root: PathRoot::Relative,
            trailing_slash: self.trailing_slash && !segments.is_empty(),
            segments,
        })
    }

    /// Appends `other` to `self` (`~` in recipe terms). An absolute `other`
    /// replaces `self` wholesale. The result is not normalized.
    pub fn join(&self, other: &TypedPath) -> Result<TypedPath, PathValidationError> {
        let other = other.to_format(self.format)?;
        if other.is_absolute() {
            return Ok(other);
        }
        let mut segments = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Ok(TypedPath {
            format: self.format,
            root: self.root.clone(),
            trailing_slash: if other.segments.is_empty() {
                self.trailing_slash
            } else {
                other.trailing_slash
            },
            segments,
        })
    }

    /// Re-validates every segment for `format`. A Windows drive or UNC
    /// root degrades to leading plain segments in the slash formats.
    pub fn to_format(&self, format: PathFormat) -> Result<TypedPath, PathValidationError> {
        if self.format == format {
            return Ok(self.clone());
        }
        let mut segments: Vec<String> = Vec::with_capacity(self.segments.len() + 2);
        let root = match (&self.root, format) {
            (PathRoot::Relative, _) => PathRoot::Relative,
            (PathRoot::Slash, _) => PathRoot::Slash,
            (PathRoot::Drive(d), PathFormat::Windows) => PathRoot::Drive(d.clone()),
            (PathRoot::Unc(h, s), PathFormat::Windows) => PathRoot::Unc(h.clone(), s.clone()),
            (PathRoot::Drive(d), _) => {
                segments.push(d.clone());
                PathRoot::Slash
            }
            (PathRoot::Unc(h, s), _) => {
                segments.push(h.clone());
                segments.push(s.clone());
                PathRoot::Slash
            }
        };
        segments.extend(self.segments.iter().cloned());
        for seg in &segments {
            validate_segment(seg, format)?;
        }
        Ok(TypedPath {
            format,
            root,
            segments,
            trailing_slash: self.trailing_slash,
        })
    }

    fn render(&self, native: bool) -> String {
        let sep = self.format.separator();
        let mut out = String::new();
        match &self.root {
            PathRoot::Relative => {}
            PathRoot::Slash => out.push(sep),
            PathRoot::Drive(d) => {
                out.push_str(d);
                out.push(sep);
            }
            PathRoot::Unc(h, s) => {
                out.push(sep);
                out.push(sep);
                out.push_str(h);
                out.push(sep);
                out.push_str(s);
                out.push(sep);
            }
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push(sep);
            }
            if self.format == PathFormat::Inet {
                out.push_str(&encode_segment(seg));
            } else {
                out.push_str(seg);
            }
        }
        if self.trailing_slash && !self.segments.is_empty() {
            out.push(sep);
        }
        if native && out.is_empty() {
            return if self.trailing_slash { "./".into() } else { ".".into() };
        }
        out
    }

    /// Like `to_string`, but an empty relative path yields `.` so the
    /// result is always usable as a process argument.
    pub fn to_native_string(&self) -> String {
        self.render(true)
    }

    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(self.render(true))
    }
}

/// Shortens `path` to be relative to `base` when possible; used to keep
/// compiler command lines short. Any failure leaves the input untouched.
pub fn shorten_path(path: &str, base: &std::path::Path) -> String {
    let format = PathFormat::native();
    let (Ok(p), Ok(b)) = (
        TypedPath::parse(path, format),
        TypedPath::parse(&base.to_string_lossy(), format),
    ) else {
        return path.to_string();
    };
    if !p.is_absolute() || !b.is_absolute() {
        return path.to_string();
    }
    match p.relative_to(&b) {
        Ok(rel) if !rel.is_absolute() => rel.to_native_string(),
        _ => path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posix(s: &str) -> TypedPath {
        TypedPath::parse(s, PathFormat::Posix).unwrap()
    }

    fn windows(s: &str) -> TypedPath {
        TypedPath::parse(s, PathFormat::Windows).unwrap()
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(posix("/a/./b/../c").normalized().unwrap().to_string(), "/a/c");
        assert_eq!(posix("a/../../b").normalized().unwrap().to_string(), "../b");
        assert_eq!(posix("a//b///c").to_string(), "a/b/c");
    }

    #[test]
    fn normalize_rejects_root_escape() {
        let err = posix("/a/../..").normalized().unwrap_err();
        assert!(matches!(err, PathValidationError::EscapesRoot(_)));
    }

    #[test]
    fn absolute_rules() {
        assert!(posix("/a").is_absolute());
        assert!(!posix("a/b").is_absolute());
        assert!(windows("c:\\x").is_absolute());
        assert!(windows("\\x").is_absolute());
        assert!(windows("/x").is_absolute());
        assert!(windows("\\\\host\\share\\x").is_absolute());
        assert!(!windows("x\\y").is_absolute());
    }

    #[test]
    fn windows_unc_needs_host_and_share() {
        assert!(matches!(
            TypedPath::parse("\\\\host", PathFormat::Windows),
            Err(PathValidationError::IncompleteUnc(_))
        ));
    }

    #[test]
    fn relative_to_posix() {
        let a = posix("/a/b/c/d");
        let b = posix("/a/b/x");
        assert_eq!(a.relative_to(&b).unwrap().to_string(), "../c/d");
    }

    #[test]
    fn relative_to_requires_absolute() {
        assert!(posix("a").relative_to(&posix("/b")).is_err());
        assert!(posix("/a").relative_to(&posix("b")).is_err());
    }

    #[test]
    fn relative_to_refuses_to_cross_drives() {
        let a = windows("c:\\x\\y");
        let b = windows("d:\\x");
        // unchanged, not an error
        assert_eq!(a.relative_to(&b).unwrap(), a);

        let ua = windows("\\\\h1\\share\\f");
        let ub = windows("\\\\h2\\share\\f");
        assert_eq!(ua.relative_to(&ub).unwrap(), ua);
    }

    #[test]
    fn relative_to_keeps_unc_prefix_atomic() {
        let a = windows("\\\\host\\share\\x\\y");
        let b = windows("\\\\host\\share\\x");
        assert_eq!(a.relative_to(&b).unwrap().to_string(), "y");
        // the share itself is never consumed by `..` hops
        let c = windows("\\\\host\\share\\z");
        assert_eq!(a.relative_to(&c).unwrap().to_string(), "..\\x\\y");
    }

    #[test]
    fn join_round_trip() {
        let b = posix("/a/b");
        let a = posix("/a/b/c/d/");
        let rel = a.relative_to(&b).unwrap();
        let joined = b.join(&rel).unwrap().normalized().unwrap();
        assert_eq!(joined, a.normalized().unwrap());
    }

    #[test]
    fn empty_path_rendering() {
        let p = posix("");
        assert_eq!(p.to_string(), "");
        assert_eq!(p.to_native_string(), ".");
    }

    #[test]
    fn inet_segment_codec() {
        assert_eq!(encode_segment("a b+c"), "a%20b+c");
        assert_eq!(decode_segment("a%20b").unwrap(), "a b");
        assert!(decode_segment("%zz").is_err());

        let p = TypedPath::parse("/x/a%20b", PathFormat::Inet).unwrap();
        assert_eq!(p.back(), Some("a b"));
        assert_eq!(p.to_string(), "/x/a%20b");
    }

    #[test]
    fn format_conversion_revalidates() {
        let p = posix("/a/x|y");
        assert!(matches!(
            p.to_format(PathFormat::Windows),
            Err(PathValidationError::InvalidChar { .. })
        ));
        assert_eq!(
            windows("c:\\a\\b").to_format(PathFormat::Posix).unwrap().to_string(),
            "/c:/a/b"
        );
    }

    #[test]
    fn render_windows() {
        use expect_test::expect;
        let shapes = [
            windows("c:\\a\\b").to_string(),
            windows("\\\\host\\share\\a").to_string(),
            windows("a/b\\c").to_string(),
            windows("\\x\\").to_string(),
        ];
        expect![[r#"
            [
                "c:\\a\\b",
                "\\\\host\\share\\a",
                "a\\b\\c",
                "\\x\\",
            ]
        "#]]
        .assert_debug_eq(&shapes);
    }

    #[test]
    fn shorten_path_leaves_foreign_paths_alone() {
        assert_eq!(shorten_path("rel/x.d", std::path::Path::new("/cwd")), "rel/x.d");
    }
}
