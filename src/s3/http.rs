// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2022 MinIO, Inc.
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

use crate::s3::error::ValidationErr;
use crate::s3::multimap_ext::{Multimap, MultimapExt};
use crate::s3::utils::urlencode_object_key;
use http::Uri;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref AWS_S3_ENDPOINT_REGEX: Regex =
        Regex::new(r"^s3(\.dualstack)?(\.|-)(([a-z\d-]{1,63})\.)?amazonaws\.com(\.cn)?$").unwrap();
    static ref AWS_ENDPOINT_REGEX: Regex = Regex::new(r".*\.amazonaws\.com(|\.cn)$").unwrap();
}

#[derive(Clone, Debug)]
/// Represents HTTP URL
pub struct Url {
    pub https: bool,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: Multimap,
}

impl Url {
    pub fn host_header_value(&self) -> String {
        if self.port > 0 {
            return format!("{}:{}", self.host, self.port);
        }
        self.host.clone()
    }
}

impl Default for Url {
    fn default() -> Self {
        Self {
            https: true,
            host: String::default(),
            port: u16::default(),
            path: String::default(),
            query: Multimap::default(),
        }
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.host.is_empty() {
            return Err(std::fmt::Error);
        }

        if self.https {
            f.write_str("https://")?;
        } else {
            f.write_str("http://")?;
        }

        if self.port > 0 {
            f.write_str(&format!("{}:{}", self.host, self.port))?;
        } else {
            f.write_str(&self.host)?;
        }

        if !self.path.starts_with('/') {
            f.write_str("/")?;
        }
        f.write_str(&self.path)?;

        if !self.query.is_empty() {
            f.write_str("?")?;
            f.write_str(&self.query.to_query_string())?;
        }

        Ok(())
    }
}

pub fn match_aws_endpoint(value: &str) -> bool {
    AWS_ENDPOINT_REGEX.is_match(value.to_lowercase().as_str())
}

/// Returns the region embedded in an Amazon S3 host name, an empty string
/// for the global endpoint, or `None` when the host is not an S3 endpoint.
pub fn aws_s3_region(host: &str) -> Option<String> {
    let host = host.to_lowercase();
    let caps = AWS_S3_ENDPOINT_REGEX.captures(&host)?;
    Some(
        caps.get(4)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    )
}

#[derive(Clone, Debug)]
/// Represents Base URL of S3 endpoint
pub struct BaseUrl {
    pub https: bool,
    host: String,
    port: u16,
    pub region: String,
    aws_host: bool,
    pub virtual_style: bool,
}

impl Default for BaseUrl {
    fn default() -> Self {
        Self {
            https: true,
            host: "127.0.0.1".to_string(),
            port: 9000,
            region: "".to_string(),
            aws_host: false,
            virtual_style: false,
        }
    }
}

impl FromStr for BaseUrl {
    type Err = ValidationErr;

    /// Convert a string to a BaseUrl.
    ///
    /// Enables use of [`str::parse`] method to create a [`BaseUrl`].
    ///
    /// # Examples
    ///
    /// ```
    /// use s3_upload::s3::http::BaseUrl;
    ///
    /// let base_url: BaseUrl = "play.min.io".parse().unwrap();
    /// let base_url: BaseUrl = "http://192.168.124.63:9000".parse().unwrap();
    /// let base_url: BaseUrl = "https://s3.us-west-2.amazonaws.com".parse().unwrap();
    /// assert_eq!(base_url.region, "us-west-2");
    /// ```
    fn from_str(s: &str) -> Result<Self, ValidationErr> {
        let url = s
            .parse::<Uri>()
            .map_err(|e| ValidationErr::InvalidBaseUrl(e.to_string()))?;

        let https = match url.scheme_str() {
            None | Some("https") => true,
            Some("http") => false,
            Some(_) => {
                return Err(ValidationErr::InvalidBaseUrl(
                    "scheme must be http or https".into(),
                ));
            }
        };

        let host = match url.host() {
            Some(h) if !h.is_empty() => h,
            _ => {
                return Err(ValidationErr::InvalidBaseUrl(
                    "valid host must be provided".into(),
                ));
            }
        };
        let host = if host.parse::<std::net::Ipv6Addr>().is_ok() {
            format!("[{host}]")
        } else {
            host.to_string()
        };

        let mut port = url.port_u16().unwrap_or(0);
        if (https && port == 443) || (!https && port == 80) {
            port = 0;
        }

        if url.path() != "/" && !url.path().is_empty() {
            return Err(ValidationErr::InvalidBaseUrl(
                "path must be empty for base URL".into(),
            ));
        }
        if url.query().is_some() {
            return Err(ValidationErr::InvalidBaseUrl(
                "query must be none for base URL".into(),
            ));
        }

        let (aws_host, region) = match aws_s3_region(&host) {
            Some(region) => (true, region),
            None if match_aws_endpoint(&host) => {
                return Err(ValidationErr::UrlBuildError(format!(
                    "invalid Amazon AWS host {host}"
                )));
            }
            None => (false, String::new()),
        };
        let virtual_style = aws_host || host.ends_with("aliyuncs.com");

        Ok(BaseUrl {
            https,
            host,
            port,
            region,
            aws_host,
            virtual_style,
        })
    }
}

impl BaseUrl {
    /// Checks base URL is AWS host
    pub fn is_aws_host(&self) -> bool {
        self.aws_host
    }

    /// Builds URL from base URL for given parameters for S3 operation
    pub fn build_url(
        &self,
        query: &Multimap,
        bucket: &str,
        object: Option<&str>,
    ) -> Result<Url, ValidationErr> {
        if bucket.is_empty() {
            return Err(ValidationErr::UrlBuildError(
                "bucket name cannot be empty".into(),
            ));
        }

        // Dotted bucket names break TLS certificate matching of virtual hosts.
        let path_style = !self.virtual_style || (bucket.contains('.') && self.https);

        let mut url = Url {
            https: self.https,
            host: self.host.clone(),
            port: self.port,
            path: String::new(),
            query: query.clone(),
        };
        if path_style {
            url.path.push('/');
            url.path.push_str(bucket);
        } else {
            url.host = format!("{bucket}.{}", self.host);
        }

        match object {
            Some(v) => {
                if !v.starts_with('/') {
                    url.path.push('/');
                }
                url.path.push_str(&urlencode_object_key(v));
            }
            None if url.path.is_empty() => url.path.push('/'),
            None => {}
        }

        Ok(url)
    }
}
