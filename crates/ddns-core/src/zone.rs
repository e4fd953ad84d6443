//! Zone resolution
//!
//! Maps a hostname onto the provider zone that should hold its A record.

use crate::host::HostName;
use crate::traits::Zone;

/// Pick the most specific zone containing `domain`
///
/// A zone matches when the domain equals its name or ends with `.` + name.
/// The longest matching name wins; on an equal-length tie the first zone
/// encountered is kept. Zones with blank names never match.
pub fn best_zone_for_domain<'a>(domain: &HostName, zones: &'a [Zone]) -> Option<&'a Zone> {
    let mut best: Option<(&Zone, usize)> = None;
    for zone in zones {
        let len = zone.name.trim().trim_end_matches('.').len();
        if len == 0 || !domain.is_within(&zone.name) {
            continue;
        }
        if best.is_none_or(|(_, best_len)| len > best_len) {
            best = Some((zone, len));
        }
    }
    best.map(|(zone, _)| zone)
}

/// Resolve the zone for `domain`, honouring an optional zone restriction
///
/// With a restriction only the zone named exactly like it is eligible, and
/// only when the domain lies under it.
pub fn resolve_zone<'a>(
    domain: &HostName,
    zones: &'a [Zone],
    restriction: Option<&str>,
) -> Option<&'a Zone> {
    let Some(target) = restriction.map(|z| z.trim().trim_end_matches('.').to_ascii_lowercase())
    else {
        return best_zone_for_domain(domain, zones);
    };
    if target.is_empty() {
        return best_zone_for_domain(domain, zones);
    }

    zones.iter().find(|zone| {
        zone.name.trim().trim_end_matches('.').eq_ignore_ascii_case(&target)
            && domain.is_within(&target)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(id: &str, name: &str) -> Zone {
        Zone {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn host(name: &str) -> HostName {
        HostName::parse(name).unwrap()
    }

    #[test]
    fn test_longest_suffix_wins() {
        let zones = vec![zone("1", "example.com"), zone("2", "sub.example.com")];
        let best = best_zone_for_domain(&host("a.sub.example.com"), &zones).unwrap();
        assert_eq!(best.id, "2");

        let reversed = vec![zone("2", "sub.example.com"), zone("1", "example.com")];
        let best = best_zone_for_domain(&host("a.sub.example.com"), &reversed).unwrap();
        assert_eq!(best.id, "2");
    }

    #[test]
    fn test_apex_and_label_boundaries() {
        let zones = vec![zone("1", "example.com")];
        assert!(best_zone_for_domain(&host("example.com"), &zones).is_some());
        assert!(best_zone_for_domain(&host("badexample.com"), &zones).is_none());
        assert!(best_zone_for_domain(&host("example.org"), &zones).is_none());
    }

    #[test]
    fn test_zone_names_are_case_insensitive() {
        let zones = vec![zone("1", " Example.COM ")];
        assert_eq!(
            best_zone_for_domain(&host("www.example.com"), &zones).map(|z| z.id.as_str()),
            Some("1")
        );
    }

    #[test]
    fn test_blank_zone_names_are_ignored() {
        let zones = vec![zone("0", ""), zone("1", "example.com")];
        assert_eq!(
            best_zone_for_domain(&host("www.example.com"), &zones).map(|z| z.id.as_str()),
            Some("1")
        );
    }

    #[test]
    fn test_equal_length_tie_keeps_first() {
        let zones = vec![zone("first", "example.com"), zone("second", "example.com")];
        assert_eq!(
            best_zone_for_domain(&host("a.example.com"), &zones).map(|z| z.id.as_str()),
            Some("first")
        );
    }

    #[test]
    fn test_restriction_limits_candidates() {
        let zones = vec![zone("1", "example.com"), zone("2", "sub.example.com")];

        let restricted = resolve_zone(&host("a.sub.example.com"), &zones, Some("example.com"));
        assert_eq!(restricted.map(|z| z.id.as_str()), Some("1"));

        let outside = resolve_zone(&host("a.other.org"), &zones, Some("example.com"));
        assert!(outside.is_none());

        let unknown = resolve_zone(&host("a.example.net"), &zones, Some("example.net"));
        assert!(unknown.is_none());
    }

    #[test]
    fn test_blank_restriction_falls_back_to_best_match() {
        let zones = vec![zone("1", "example.com"), zone("2", "sub.example.com")];
        let resolved = resolve_zone(&host("a.sub.example.com"), &zones, Some("  "));
        assert_eq!(resolved.map(|z| z.id.as_str()), Some("2"));
    }
}
