//! Authentication-interstitial detection.

/// Recognises login-provider pages by hostname substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterstitialMatcher {
	hosts: Vec<String>,
}

impl InterstitialMatcher {
	pub fn new<I, S>(hosts: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self {
			hosts: hosts
				.into_iter()
				.map(|h| h.as_ref().trim().to_ascii_lowercase())
				.filter(|h| !h.is_empty())
				.collect(),
		}
	}

	/// Returns `true` when `url` points at a known login provider.
	pub fn matches(&self, url: &str) -> bool {
		let url = url.to_ascii_lowercase();
		self.hosts.iter().any(|host| url.contains(host.as_str()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::DEFAULT_INTERSTITIAL_HOST;

	#[test]
	fn matches_login_provider() {
		let matcher = InterstitialMatcher::new([DEFAULT_INTERSTITIAL_HOST]);
		assert!(matcher.matches("https://login.microsoftonline.com/common/oauth2/authorize?x=1"));
		assert!(matcher.matches("https://LOGIN.MicrosoftOnline.com/"));
		assert!(!matcher.matches("https://intranet.example.com/app"));
	}

	#[test]
	fn blank_hosts_are_ignored() {
		let matcher = InterstitialMatcher::new(["", "  "]);
		assert!(!matcher.matches("https://anything"));
	}

	#[test]
	fn any_configured_host_matches() {
		let matcher = InterstitialMatcher::new(["sso.corp.example", "accounts.google.com"]);
		assert!(matcher.matches("https://accounts.google.com/signin"));
		assert!(matcher.matches("https://sso.corp.example/login"));
	}
}
