//! REST routes and rate limit bucket keys
//!
//! A route is a method plus a path template such as
//! `/channels/{channel_id}/messages/{message_id}`. Rate limit buckets are
//! shared by every request with the same method, template, and major
//! parameters.

use reqwest::Method;
use std::fmt;

/// Path parameters that split rate limit buckets
pub const MAJOR_PARAMETERS: &[&str] = &["channel_id", "guild_id", "webhook_id", "webhook_token"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    method: Method,
    template: &'static str,
    path: String,
    major: Vec<(&'static str, String)>,
}

impl Route {
    pub fn new(method: Method, template: &'static str) -> Self {
        Self {
            method,
            template,
            path: template.to_string(),
            major: Vec::new(),
        }
    }

    pub fn get(template: &'static str) -> Self {
        Self::new(Method::GET, template)
    }

    pub fn post(template: &'static str) -> Self {
        Self::new(Method::POST, template)
    }

    pub fn put(template: &'static str) -> Self {
        Self::new(Method::PUT, template)
    }

    pub fn patch(template: &'static str) -> Self {
        Self::new(Method::PATCH, template)
    }

    pub fn delete(template: &'static str) -> Self {
        Self::new(Method::DELETE, template)
    }

    /// Substitute `{name}` in the path
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl fmt::Display) -> Self {
        let value = value.to_string();
        self.path = self.path.replace(&format!("{{{name}}}"), &value);
        if MAJOR_PARAMETERS.contains(&name) {
            self.major.push((name, value));
        }
        self
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn template(&self) -> &'static str {
        self.template
    }

    /// `METHOD template`, shared by all major parameter values
    pub fn route_key(&self) -> String {
        format!("{} {}", self.method, self.template)
    }

    /// Major parameter values joined with `:`
    pub fn major_parameters(&self) -> String {
        MAJOR_PARAMETERS
            .iter()
            .filter_map(|name| {
                self.major
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.as_str())
            })
            .collect::<Vec<_>>()
            .join(":")
    }

    /// Bucket key used before the server has told us its bucket hash
    pub fn bucket_key(&self) -> String {
        format!("{}:{}", self.route_key(), self.major_parameters())
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}
