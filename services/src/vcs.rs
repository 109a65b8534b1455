/// Repository identity parsed out of a version-control URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoLocator {
    pub provider: String,
    pub org: String,
    pub name: String,
}

impl RepoLocator {
    /// Any empty component means the URL did not resolve to a usable
    /// repository identity.
    pub fn is_complete(&self) -> bool {
        !self.provider.is_empty() && !self.org.is_empty() && !self.name.is_empty()
    }

    pub fn org_slash_name(&self) -> String {
        format!("{}/{}", self.org, self.name)
    }
}

impl std::fmt::Display for RepoLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "git@{}:{}/{}", self.provider, self.org, self.name)
    }
}

/// Split a git URL into (provider, org, name).
///
/// Handles the ssh form `git@github.com:org/name.git` and the https form
/// `https://bitbucket.org/org/name`. Anything else yields an incomplete
/// locator, which validation rejects.
pub fn parse_git_url(url: &str) -> RepoLocator {
    const SSH_PREFIX: &str = "git@";
    const HTTPS_PREFIX: &str = "https://";
    const GIT_SUFFIX: &str = ".git";

    let (provider, full_name) = if let Some(rest) = url.strip_prefix(SSH_PREFIX) {
        match rest.split_once(':') {
            Some((provider, full_name)) => (provider, full_name),
            None => return RepoLocator::default(),
        }
    } else if let Some(rest) = url.strip_prefix(HTTPS_PREFIX) {
        match rest.split_once('/') {
            Some((provider, full_name)) => (provider, full_name),
            None => return RepoLocator::default(),
        }
    } else {
        return RepoLocator::default();
    };

    let (org, name) = match full_name.split_once('/') {
        Some((org, name)) => (org, name),
        None => (full_name, ""),
    };
    let name = name.strip_suffix(GIT_SUFFIX).unwrap_or(name);

    RepoLocator {
        provider: provider.to_string(),
        org: org.to_string(),
        name: name.to_string(),
    }
}

/// The exclusion list holds "org/name" entries.
pub fn is_excluded_repo(locator: &RepoLocator, excluded: &[String]) -> bool {
    let key = locator.org_slash_name();
    excluded.iter().any(|entry| entry == &key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ssh_form() {
        let locator = parse_git_url("git@github.com:acme/100ft-web.git");
        assert_eq!(locator.provider, "github.com");
        assert_eq!(locator.org, "acme");
        assert_eq!(locator.name, "100ft-web");
        assert!(locator.is_complete());
    }

    #[test]
    fn parses_https_form_without_git_suffix() {
        let locator = parse_git_url("https://bitbucket.org/acme/fleetinv");
        assert_eq!(locator.provider, "bitbucket.org");
        assert_eq!(locator.org, "acme");
        assert_eq!(locator.name, "fleetinv");
    }

    #[test]
    fn unknown_scheme_is_incomplete() {
        assert!(!parse_git_url("ftp://nowhere/acme/x").is_complete());
        assert!(!parse_git_url("").is_complete());
        assert!(!parse_git_url("git@github.com").is_complete());
    }

    #[test]
    fn missing_name_is_incomplete() {
        let locator = parse_git_url("https://github.com/acme");
        assert!(!locator.is_complete());
    }

    #[test]
    fn exclusion_matches_on_org_and_name() {
        let locator = parse_git_url("git@github.com:acme/scratch.git");
        let excluded = vec!["acme/scratch".to_string()];
        assert!(is_excluded_repo(&locator, &excluded));
        assert!(!is_excluded_repo(&locator, &["acme/other".to_string()]));
    }
}
