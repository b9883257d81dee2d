//! Address family detection over a candidate list.

use std::net::SocketAddr;

/// Which address families appear in a candidate list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Families {
    pub has_v4: bool,
    pub has_v6: bool,
}

impl Families {
    /// Both IPv4 and IPv6 are present.
    pub fn is_mixed(&self) -> bool {
        self.has_v4 && self.has_v6
    }
}

/// Scans `candidates` once, stopping as soon as both families are seen.
pub fn classify<'a, I>(candidates: I) -> Families
where
    I: IntoIterator<Item = &'a SocketAddr>,
{
    let mut families = Families::default();
    for endpoint in candidates {
        match endpoint {
            SocketAddr::V4(_) => families.has_v4 = true,
            SocketAddr::V6(_) => families.has_v6 = true,
        }
        if families.is_mixed() {
            break;
        }
    }
    families
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs(list: &[&str]) -> Vec<SocketAddr> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[test]
    fn test_classify_empty() {
        let families = classify(std::iter::empty());
        assert_eq!(families, Families::default());
        assert!(!families.is_mixed());
    }

    #[test]
    fn test_classify_single_family() {
        let v4 = classify(&addrs(&["192.0.2.1:80", "192.0.2.2:80"]));
        assert!(v4.has_v4 && !v4.has_v6);
        assert!(!v4.is_mixed());

        let v6 = classify(&addrs(&["[2001:db8::1]:80"]));
        assert!(!v6.has_v4 && v6.has_v6);
    }

    #[test]
    fn test_classify_mixed() {
        let families = classify(&addrs(&["192.0.2.1:80", "192.0.2.2:80", "[::1]:80"]));
        assert!(families.is_mixed());
    }

    #[test]
    fn test_v4_mapped_v6_counts_as_v6() {
        let families = classify(&addrs(&["[::ffff:192.0.2.1]:80"]));
        assert!(families.has_v6);
        assert!(!families.has_v4);
    }
}
