//! The `ipld://` URL model.
//!
//! Grammar, atop standard URL syntax:
//!
//! ```text
//! ipld://<root>[;k=v[;k=v...]][/<segment>[;k=v...]]*[/]
//! <root>    := CID (base32 or base36 multibase; decoded to CIDv1)
//! <segment> := percent-encoded name (";" MUST appear percent-encoded as
//!              "%3B" inside a name; "/" inside a name is "%2F")
//! ```
//!
//! Root parameters live in the authority after the first `;`; segment
//! parameters live after the first `;` of a path component. Keys, values,
//! and names are percent-decoded on parse and percent-encoded on serialize,
//! with `;` escaped beyond standard URL escaping — the generic `url` crate
//! cannot express that rule, so the component codec here is a small explicit
//! table.
//!
//! A trailing `/` requests that a terminal link be followed to its node
//! rather than returned as a link (`resolve_final`).

use std::fmt;
use std::str::FromStr;

use cid::Cid;
use multibase::Base;

use crate::errors::{DagError, DagResult};
use crate::params::Parameters;

/// One path component: a decoded name plus its `;k=v` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Segment {
    pub name: String,
    pub parameters: Parameters,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameters(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }
}

/// A parsed `ipld://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpldUrl {
    cid: Cid,
    parameters: Parameters,
    segments: Vec<Segment>,
    resolve_final: bool,
    base: Base,
}

impl IpldUrl {
    /// Build a URL from a root CID, with no parameters or path.
    ///
    /// The CID is normalized to CIDv1; display uses base32.
    pub fn from_cid(cid: Cid) -> DagResult<Self> {
        Ok(Self {
            cid: to_v1(cid)?,
            parameters: Parameters::new(),
            segments: Vec::new(),
            resolve_final: false,
            base: Base::Base32Lower,
        })
    }

    /// Parse an `ipld://` URL string.
    pub fn parse(input: &str) -> DagResult<Self> {
        let rest = input
            .strip_prefix("ipld://")
            .ok_or_else(|| DagError::bad_url(format!("scheme is not ipld: {input}")))?;

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let (cid_str, authority_params) = match authority.find(';') {
            Some(idx) => (&authority[..idx], Some(&authority[idx + 1..])),
            None => (authority, None),
        };

        if cid_str.is_empty() {
            return Err(DagError::bad_url("missing CID authority"));
        }

        // base36 inputs keep base36 display; everything else canonicalizes
        // to base32
        let base = if cid_str.starts_with('k') || cid_str.starts_with('K') {
            Base::Base36Lower
        } else {
            Base::Base32Lower
        };

        let cid = Cid::from_str(cid_str)
            .map_err(|e| DagError::bad_url(format!("malformed CID {cid_str:?}: {e}")))?;
        let cid = to_v1(cid)?;

        let parameters = match authority_params {
            Some(s) => parse_parameters(s)?,
            None => Parameters::new(),
        };

        let mut segments = Vec::new();
        let mut resolve_final = false;

        if let Some(path) = path {
            let mut components: Vec<&str> = path.split('/').collect();
            if components.last() == Some(&"") {
                components.pop();
                resolve_final = true;
            }
            for component in components {
                segments.push(parse_segment(component)?);
            }
        }

        Ok(Self {
            cid,
            parameters,
            segments,
            resolve_final,
            base,
        })
    }

    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Replace the authority CID, preserving root parameters and path.
    pub fn set_cid(&mut self, cid: Cid) -> DagResult<()> {
        self.cid = to_v1(cid)?;
        Ok(())
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.parameters
    }

    /// Replace root parameters, preserving the CID and path.
    pub fn set_parameters(&mut self, parameters: Parameters) {
        self.parameters = parameters;
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut Vec<Segment> {
        &mut self.segments
    }

    /// Replace the entire path. An empty segment list produces an empty
    /// path: no trailing slash is synthesized.
    pub fn set_segments(&mut self, segments: Vec<Segment>) {
        if segments.is_empty() {
            self.resolve_final = false;
        }
        self.segments = segments;
    }

    /// Whether the path ended with a trailing `/`.
    pub fn resolve_final(&self) -> bool {
        self.resolve_final
    }

    pub fn set_resolve_final(&mut self, resolve_final: bool) {
        self.resolve_final = resolve_final;
    }

    /// The multibase used for authority display (base32 unless the input
    /// used base36).
    pub fn base(&self) -> Base {
        self.base
    }

    /// Serialize back to string form.
    pub fn to_url_string(&self) -> String {
        let cid_str = self
            .cid
            .to_string_of_base(self.base)
            .unwrap_or_else(|_| self.cid.to_string());

        let mut out = format!("ipld://{cid_str}");
        write_parameters(&mut out, &self.parameters);

        for segment in &self.segments {
            out.push('/');
            out.push_str(&encode_component(&segment.name));
            write_parameters(&mut out, &segment.parameters);
        }
        if self.resolve_final {
            out.push('/');
        }
        out
    }
}

impl fmt::Display for IpldUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url_string())
    }
}

impl FromStr for IpldUrl {
    type Err = DagError;

    fn from_str(s: &str) -> DagResult<Self> {
        Self::parse(s)
    }
}

fn to_v1(cid: Cid) -> DagResult<Cid> {
    cid.into_v1()
        .map_err(|e| DagError::bad_url(format!("cannot normalize CID to v1: {e}")))
}

fn parse_segment(component: &str) -> DagResult<Segment> {
    match component.find(';') {
        Some(idx) => Ok(Segment {
            name: decode_component(&component[..idx])?,
            parameters: parse_parameters(&component[idx + 1..])?,
        }),
        None => Ok(Segment {
            name: decode_component(component)?,
            parameters: Parameters::new(),
        }),
    }
}

fn parse_parameters(s: &str) -> DagResult<Parameters> {
    let mut params = Parameters::new();
    for pair in s.split(';') {
        if pair.is_empty() {
            continue;
        }
        match pair.find('=') {
            Some(idx) => params.append(
                decode_component(&pair[..idx])?,
                decode_component(&pair[idx + 1..])?,
            ),
            None => params.append(decode_component(pair)?, ""),
        }
    }
    Ok(params)
}

fn write_parameters(out: &mut String, params: &Parameters) {
    for (k, v) in params.iter() {
        out.push(';');
        out.push_str(&encode_component(k));
        out.push('=');
        out.push_str(&encode_component(v));
    }
}

// ---------------------------------------------------------------------------
// Component percent-coding
// ---------------------------------------------------------------------------

/// Percent-encode a name, parameter key, or parameter value.
///
/// Everything outside the URL "unreserved" set is escaped; that covers the
/// grammar's extra rules (`;` → `%3B`, `/` → `%2F`, `%` → `%25`, `=` in
/// parameter text).
pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(byte as char);
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
    }
    out
}

/// Percent-decode a name, parameter key, or parameter value.
pub fn decode_component(s: &str) -> DagResult<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 3 > bytes.len() {
                return Err(DagError::bad_url(format!(
                    "truncated percent escape in {s:?}"
                )));
            }
            let hi = from_hex_digit(bytes[i + 1])
                .ok_or_else(|| DagError::bad_url(format!("bad percent escape in {s:?}")))?;
            let lo = from_hex_digit(bytes[i + 2])
                .ok_or_else(|| DagError::bad_url(format!("bad percent escape in {s:?}")))?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| DagError::bad_url(format!("component is not UTF-8: {s:?}")))
}

fn hex_digit(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

fn from_hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}
