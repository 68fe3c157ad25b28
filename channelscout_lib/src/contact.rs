//! Contact discovery in free-text channel descriptions.
//!
//! The cascade tries the strongest signal first: an email address anywhere
//! in any block wins; only when no block holds an email are social profile
//! links considered.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

pub const DEFAULT_PROFILE_HOSTS: &[&str] = &["instagram.com"];

const EMAIL_PATTERN: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";

/// Contact details found for a channel. Always a set, never a bare string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum ContactInfo {
    #[default]
    None,
    Emails(Vec<String>),
    Profiles(Vec<String>),
}

impl ContactInfo {
    pub fn members(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Emails(v) | Self::Profiles(v) => v,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Emails(_) => "email",
            Self::Profiles(_) => "profile",
        }
    }

    /// `;`-joined members, the column format used by exports.
    pub fn joined(&self) -> String {
        self.members().join(";")
    }

    /// Inverse of [`ContactInfo::joined`]. Members containing `@` are emails.
    pub fn from_joined(raw: &str) -> Self {
        let members = dedup(
            raw.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
        if members.is_empty() {
            Self::None
        } else if members.iter().all(|m| m.contains('@')) {
            Self::Emails(members)
        } else {
            Self::Profiles(members)
        }
    }
}

/// Ordered email-then-profile matcher.
#[derive(Debug, Clone)]
pub struct ContactCascade {
    profile: Regex,
}

impl Default for ContactCascade {
    fn default() -> Self {
        static RE: OnceLock<Regex> = OnceLock::new();
        let profile = RE
            .get_or_init(|| Regex::new(&profile_pattern(DEFAULT_PROFILE_HOSTS)).unwrap())
            .clone();
        Self { profile }
    }
}

impl ContactCascade {
    /// Build a cascade whose second tier matches profile links on `hosts`.
    pub fn with_profile_hosts<S: AsRef<str>>(hosts: &[S]) -> Result<Self, regex::Error> {
        if hosts.is_empty() {
            return Ok(Self::default());
        }
        let profile = Regex::new(&profile_pattern(hosts))?;
        Ok(Self { profile })
    }

    /// Run the cascade over `blocks` in order.
    pub fn extract<S: AsRef<str>>(&self, blocks: &[S]) -> ContactInfo {
        for block in blocks {
            let emails = emails_in(block.as_ref());
            if !emails.is_empty() {
                return ContactInfo::Emails(emails);
            }
        }
        for block in blocks {
            let profiles = self.profiles_in(block.as_ref());
            if !profiles.is_empty() {
                return ContactInfo::Profiles(profiles);
            }
        }
        ContactInfo::None
    }

    /// Profile links in `text`, normalized to `host/handle`.
    pub fn profiles_in(&self, text: &str) -> Vec<String> {
        dedup(self.profile.captures_iter(text).filter_map(|cap| {
            let host = cap.get(1)?.as_str().to_lowercase();
            let handle = cap.get(2)?.as_str().trim_end_matches('.');
            if handle.is_empty() {
                None
            } else {
                Some(format!("{}/{}", host, handle))
            }
        }))
    }
}

/// Email addresses in `text`, deduplicated in first-seen order.
pub fn emails_in(text: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(EMAIL_PATTERN).unwrap());
    dedup(re.find_iter(text).map(|m| m.as_str().to_string()))
}

/// True when the whole of `value` is a single email address.
pub fn is_email(value: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(&format!("^{}$", EMAIL_PATTERN)).unwrap());
    let value = value.trim();
    value.contains('@') && re.is_match(value)
}

fn profile_pattern<S: AsRef<str>>(hosts: &[S]) -> String {
    let hosts: Vec<String> = hosts
        .iter()
        .map(|h| regex::escape(h.as_ref().trim()))
        .collect();
    format!(
        r"(?:^|[^A-Za-z0-9._%+@-])(?i:https?://)?(?i:www\.)?(?i:({}))/([A-Za-z0-9._]+)",
        hosts.join("|")
    )
}

fn dedup(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_in_sentence() {
        let c = ContactCascade::default();
        let got = c.extract(&["reach me at foo@bar.com, thanks"]);
        assert_eq!(got, ContactInfo::Emails(vec!["foo@bar.com".into()]));
    }

    #[test]
    fn profile_when_no_email() {
        let c = ContactCascade::default();
        let got = c.extract(&["follow instagram.com/someuser for more"]);
        assert_eq!(got, ContactInfo::Profiles(vec!["instagram.com/someuser".into()]));
    }

    #[test]
    fn nothing_found() {
        let c = ContactCascade::default();
        assert_eq!(c.extract(&["just a plain description"]), ContactInfo::None);
        let empty: [&str; 0] = [];
        assert_eq!(c.extract(&empty), ContactInfo::None);
    }

    #[test]
    fn email_beats_profile_in_same_block() {
        let c = ContactCascade::default();
        let got = c.extract(&["instagram.com/someuser or biz@studio.io"]);
        assert_eq!(got, ContactInfo::Emails(vec!["biz@studio.io".into()]));
    }

    #[test]
    fn email_in_later_block_beats_profile_in_earlier_block() {
        let c = ContactCascade::default();
        let got = c.extract(&["instagram.com/first", "mail: later@example.org"]);
        assert_eq!(got, ContactInfo::Emails(vec!["later@example.org".into()]));
    }

    #[test]
    fn first_block_with_emails_stops_the_pass() {
        let c = ContactCascade::default();
        let got = c.extract(&["a@one.com", "b@two.com"]);
        assert_eq!(got.members(), ["a@one.com"]);
    }

    #[test]
    fn duplicate_emails_collapse() {
        let got = emails_in("x@y.com x@y.com z@y.com");
        assert_eq!(got, vec!["x@y.com", "z@y.com"]);
    }

    #[test]
    fn email_requires_dotted_domain() {
        assert!(emails_in("user@localhost").is_empty());
        assert!(emails_in("user@host.c").is_empty());
    }

    #[test]
    fn profile_url_normalized() {
        let c = ContactCascade::default();
        let got = c.profiles_in("https://www.Instagram.com/Some.User_1. and http://instagram.com/other");
        assert_eq!(got, vec!["instagram.com/Some.User_1", "instagram.com/other"]);
    }

    #[test]
    fn profile_host_must_stand_alone() {
        let c = ContactCascade::default();
        assert!(c.profiles_in("notinstagram.com/x").is_empty());
        assert!(c.profiles_in("https://fakeinstagram.com/x").is_empty());
        assert!(c.profiles_in("user@instagram.com/x").is_empty());
        assert_eq!(c.profiles_in("(instagram.com/x)"), vec!["instagram.com/x"]);
        assert_eq!(
            c.profiles_in("instagram.com/a instagram.com/b"),
            vec!["instagram.com/a", "instagram.com/b"]
        );
    }

    #[test]
    fn custom_hosts() {
        let c = ContactCascade::with_profile_hosts(&["t.me", "instagram.com"]).unwrap();
        let got = c.extract(&["telegram: https://t.me/channel_news"]);
        assert_eq!(got, ContactInfo::Profiles(vec!["t.me/channel_news".into()]));
    }

    #[test]
    fn joined_round_trip() {
        let info = ContactInfo::Emails(vec!["a@b.com".into(), "c@d.org".into()]);
        assert_eq!(info.joined(), "a@b.com;c@d.org");
        assert_eq!(ContactInfo::from_joined(&info.joined()), info);
        assert_eq!(ContactInfo::None.joined(), "");
        assert_eq!(ContactInfo::from_joined(""), ContactInfo::None);
        assert_eq!(
            ContactInfo::from_joined("instagram.com/x"),
            ContactInfo::Profiles(vec!["instagram.com/x".into()])
        );
    }

    #[test]
    fn is_email_whole_value() {
        assert!(is_email(" someone@example.com "));
        assert!(!is_email("write to someone@example.com"));
        assert!(!is_email(""));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let json = serde_json::to_value(ContactInfo::Emails(vec!["a@b.com".into()])).unwrap();
        assert_eq!(json["kind"], "emails");
        assert_eq!(json["values"][0], "a@b.com");
    }
}
