// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Various utility and helper functions

use crate::s3::error::ValidationErr;
use crate::s3::segmented_bytes::SegmentedBytes;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use crc_fast::{CrcAlgorithm, Digest as CrcFastDigest};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use xmltree::Element;

/// Date and time with UTC timezone
pub type UtcTime = DateTime<Utc>;

/// SHA-256 of the empty string, hex encoded
pub const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

// Characters left alone by AWS URI encoding: A-Z a-z 0-9 - _ . ~
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

const OBJECT_KEY_ENCODE_SET: &AsciiSet = &URI_ENCODE_SET.remove(b'/');

/// Encodes data using base64 algorithm
pub fn b64_encode<T: AsRef<[u8]>>(input: T) -> String {
    BASE64.encode(input)
}

pub fn hex_encode(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2);
    for b in data {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Gets hex encoded SHA256 hash of given data
pub fn sha256_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Gets hex encoded SHA256 hash of all segments
pub fn sha256_hash_sb(sb: &SegmentedBytes) -> String {
    let mut hasher = Sha256::new();
    for data in sb.iter() {
        hasher.update(data);
    }
    format!("{:x}", hasher.finalize())
}

/// Gets base64 encoded MD5 hash of given data
pub fn md5sum_hash(data: &[u8]) -> String {
    b64_encode(md5::compute(data).0)
}

/// Gets current UTC time
pub fn utc_now() -> UtcTime {
    chrono::offset::Utc::now()
}

/// Gets signer date value of given time
pub fn to_signer_date(time: UtcTime) -> String {
    time.format("%Y%m%d").to_string()
}

/// Gets AMZ date value of given time
pub fn to_amz_date(time: UtcTime) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// URI-encodes a string per AWS Signature V4 rules
pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, URI_ENCODE_SET).collect()
}

/// URI-encodes an object key, keeping `/` separators
pub fn urlencode_object_key(key: &str) -> String {
    utf8_percent_encode(key, OBJECT_KEY_ENCODE_SET).collect()
}

/// Strips the surrounding double quotes S3 puts around ETags
pub fn trim_quotes(s: &str) -> String {
    s.trim_matches('"').to_string()
}

/// Validates the bucket and object names of an object request
pub fn check_object_args(bucket: &str, object: &str) -> Result<(), ValidationErr> {
    if bucket.is_empty() {
        return Err(ValidationErr::InvalidBucketName(
            "bucket name cannot be empty".into(),
        ));
    }
    if object.is_empty() {
        return Err(ValidationErr::InvalidObjectName(
            "object name cannot be empty".into(),
        ));
    }
    Ok(())
}

/// Gets text value of given XML element for given tag.
pub fn get_text(element: &Element, tag: &str) -> Result<String, ValidationErr> {
    element
        .get_child(tag)
        .and_then(|v| v.get_text())
        .map(|v| v.to_string())
        .ok_or_else(|| ValidationErr::XmlError(format!("<{tag}> tag not found")))
}

/// Gets optional text value of given XML element for given tag.
pub fn get_option_text(element: &Element, tag: &str) -> Option<String> {
    element
        .get_child(tag)
        .and_then(|v| v.get_text())
        .map(|v| v.to_string())
}

/// Gets default text value of given XML element for given tag.
pub fn get_default_text(element: &Element, tag: &str) -> String {
    get_option_text(element, tag).unwrap_or_default()
}

/// Checksum algorithms S3 accepts for `x-amz-checksum-*` integrity headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    CRC32,
    CRC32C,
    CRC64NVME,
    SHA1,
    SHA256,
}

impl ChecksumAlgorithm {
    /// Name used in `x-amz-checksum-algorithm`
    pub fn as_str(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::CRC32 => "CRC32",
            ChecksumAlgorithm::CRC32C => "CRC32C",
            ChecksumAlgorithm::CRC64NVME => "CRC64NVME",
            ChecksumAlgorithm::SHA1 => "SHA1",
            ChecksumAlgorithm::SHA256 => "SHA256",
        }
    }

    /// Header carrying the checksum value of a request or response body
    pub fn header_name(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::CRC32 => "x-amz-checksum-crc32",
            ChecksumAlgorithm::CRC32C => "x-amz-checksum-crc32c",
            ChecksumAlgorithm::CRC64NVME => "x-amz-checksum-crc64nvme",
            ChecksumAlgorithm::SHA1 => "x-amz-checksum-sha1",
            ChecksumAlgorithm::SHA256 => "x-amz-checksum-sha256",
        }
    }

    /// Element name inside `<Part>` of a CompleteMultipartUpload body
    pub fn xml_tag(&self) -> &'static str {
        match self {
            ChecksumAlgorithm::CRC32 => "ChecksumCRC32",
            ChecksumAlgorithm::CRC32C => "ChecksumCRC32C",
            ChecksumAlgorithm::CRC64NVME => "ChecksumCRC64NVME",
            ChecksumAlgorithm::SHA1 => "ChecksumSHA1",
            ChecksumAlgorithm::SHA256 => "ChecksumSHA256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = ValidationErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "CRC32" => Ok(ChecksumAlgorithm::CRC32),
            "CRC32C" => Ok(ChecksumAlgorithm::CRC32C),
            "CRC64NVME" => Ok(ChecksumAlgorithm::CRC64NVME),
            "SHA1" => Ok(ChecksumAlgorithm::SHA1),
            "SHA256" => Ok(ChecksumAlgorithm::SHA256),
            _ => Err(ValidationErr::StrError(format!(
                "unknown checksum algorithm {s}"
            ))),
        }
    }
}

/// Computes the base64 encoded checksum of all segments
pub fn compute_checksum_sb(algorithm: ChecksumAlgorithm, sb: &SegmentedBytes) -> String {
    match algorithm {
        ChecksumAlgorithm::CRC32 | ChecksumAlgorithm::CRC32C | ChecksumAlgorithm::CRC64NVME => {
            let crc = match algorithm {
                ChecksumAlgorithm::CRC32 => CrcAlgorithm::Crc32IsoHdlc,
                ChecksumAlgorithm::CRC32C => CrcAlgorithm::Crc32Iscsi,
                _ => CrcAlgorithm::Crc64Nvme,
            };
            let mut digest = CrcFastDigest::new(crc);
            for data in sb.iter() {
                digest.update(&data);
            }
            let value = digest.finalize();
            if algorithm == ChecksumAlgorithm::CRC64NVME {
                b64_encode(value.to_be_bytes())
            } else {
                // crc-fast returns u64; CRC32 variants need cast to u32
                b64_encode((value as u32).to_be_bytes())
            }
        }
        ChecksumAlgorithm::SHA1 => {
            let mut hasher = Sha1::new();
            for data in sb.iter() {
                hasher.update(data);
            }
            b64_encode(hasher.finalize())
        }
        ChecksumAlgorithm::SHA256 => {
            let mut hasher = Sha256::new();
            for data in sb.iter() {
                hasher.update(data);
            }
            b64_encode(hasher.finalize())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use chrono::TimeZone;

    #[test]
    fn sha256_of_empty_matches_constant() {
        assert_eq!(sha256_hash(b""), EMPTY_SHA256);
        assert_eq!(sha256_hash_sb(&SegmentedBytes::new()), EMPTY_SHA256);
    }

    #[test]
    fn segmented_hash_matches_flat_hash() {
        let mut sb = SegmentedBytes::new();
        sb.append(Bytes::from_static(b"hello "));
        sb.append(Bytes::from_static(b"world"));
        assert_eq!(sha256_hash_sb(&sb), sha256_hash(b"hello world"));
    }

    #[test]
    fn amz_dates() {
        let t = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
        assert_eq!(to_amz_date(t), "20130524T000000Z");
        assert_eq!(to_signer_date(t), "20130524");
    }

    #[test]
    fn object_keys_keep_slashes() {
        assert_eq!(urlencode_object_key("a b/c+d.txt"), "a%20b/c%2Bd.txt");
        assert_eq!(url_encode("a/b"), "a%2Fb");
    }

    #[test]
    fn known_checksums() {
        let sb = SegmentedBytes::from(Bytes::from_static(b"hello world"));
        assert_eq!(
            compute_checksum_sb(ChecksumAlgorithm::CRC32, &sb),
            "DUoRhQ=="
        );
        assert_eq!(
            compute_checksum_sb(ChecksumAlgorithm::SHA256, &sb),
            "uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek="
        );
        assert_eq!(
            compute_checksum_sb(ChecksumAlgorithm::SHA1, &sb),
            "Kq5sNclPz7QV2+lfQIuc6R7oRu0="
        );
    }

    #[test]
    fn checksum_algorithm_parses_case_insensitively() {
        assert_eq!(
            "crc32c".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::CRC32C
        );
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }
}
