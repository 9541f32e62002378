// =============================================================================
// domain.rs: THE REGISTRABLE DOMAIN CARVER
// =============================================================================
//
// "www.apple.com"                    -> "apple"
// "https://secure.bb.com.br/login"   -> "bb"
// "https://www.icIoud.com.ar/g7yS"   -> "icioud"
// "Meeting at 5pm"                   -> ""
//
// The registrable domain is the label sitting just left of the public
// suffix, as the ICANN section of the Public Suffix List defines it.
// Private-section entries (`github.io`, `blogspot.com`) are looked through,
// so `evil.github.io` carves to "github". It is the one part of a URL an
// attacker cannot borrow from the brand they are impersonating. The
// decision engine compares on it and nothing else.
//
// This function is total. Garbage in, empty string out. No panics.
// =============================================================================

use psl::Type;
use url::{Host, ParseError, Url};

/// Return the registrable domain of `url`, ignoring subdomain and suffix.
///
/// Accepts URLs without a scheme. IP hosts come back as the IP itself,
/// single-label hosts (`localhost`) as that label, and hosts under a
/// top-level label the list does not know as that last label. Anything
/// unparsable yields `""`.
pub fn get_url_domain(url: &str) -> String {
    let Some(host) = parse_host(url) else {
        return String::new();
    };

    match host {
        Host::Domain(name) => registrable_label(&name),
        Host::Ipv4(ip) => ip.to_string(),
        Host::Ipv6(ip) => ip.to_string(),
    }
}

/// Parse whatever we were handed into a host, assuming `http` when the
/// scheme is missing.
fn parse_host(raw: &str) -> Option<Host<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    match Url::parse(raw) {
        Ok(parsed) if !parsed.cannot_be_a_base() => parsed.host().map(|h| h.to_owned()),
        // `apple.com:443/x` and `localhost:8080` parse with the host as scheme.
        Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => {
            let rest = raw.strip_prefix("//").unwrap_or(raw);
            let parsed = Url::parse(&format!("http://{rest}")).ok()?;
            parsed.host().map(|h| h.to_owned())
        }
        Err(_) => None,
    }
}

fn registrable_label(host: &str) -> String {
    let host = host.trim_end_matches('.').to_lowercase();
    let labels: Vec<&str> = host.split('.').collect();

    if labels.iter().any(|l| l.is_empty()) {
        return String::new();
    }
    if labels.len() == 1 {
        return labels[0].to_string();
    }

    let suffix_len = match icann_suffix_len(&labels) {
        // Unknown top-level label: no suffix, the last label is the domain.
        0 => return labels[labels.len() - 1].to_string(),
        n => n,
    };

    if labels.len() <= suffix_len {
        // The host is nothing but a public suffix.
        return String::new();
    }

    labels[labels.len() - suffix_len - 1].to_string()
}

/// Number of labels in the ICANN public suffix of `labels`, or 0 when the
/// list has no rule for it. A private-section match is retried one label
/// shorter until an ICANN rule answers.
fn icann_suffix_len(labels: &[&str]) -> usize {
    let mut take = labels.len();

    while take > 0 {
        let candidate = labels[labels.len() - take..].join(".");
        let Some(suffix) = psl::suffix(candidate.as_bytes()) else {
            return 0;
        };
        let len = suffix.as_bytes().split(|b| *b == b'.').count();

        match suffix.typ() {
            Some(Type::Icann) => return len,
            Some(_) => take = len - 1,
            None => return 0,
        }
    }

    0
}
