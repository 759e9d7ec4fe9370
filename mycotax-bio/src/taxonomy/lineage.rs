//! Lineage extraction from UNITE-formatted FASTA headers
//!
//! UNITE headers look like
//! `name|accession|SH|refs|k__Fungi;p__Ascomycota;c__...;o__...;f__...;g__...;s__...`.
//! Kingdom is implied (all fungi) and dropped.

use mycotax_core::UNKNOWN_STR;

const RANK_PREFIXES: [&str; 6] = ["p__", "c__", "o__", "f__", "g__", "s__"];

/// Extract the six-rank lineage from a header, `None` if it carries no lineage field
pub fn parse_unite_lineage(header: &str) -> Option<[String; 6]> {
    let field = header
        .split('|')
        .find(|f| f.contains("k__") || f.contains("p__"))?;

    let mut lineage: [String; 6] = std::array::from_fn(|_| UNKNOWN_STR.to_string());
    for part in field.split(';') {
        let part = part.trim();
        if let Some(i) = RANK_PREFIXES.iter().position(|p| part.starts_with(p)) {
            lineage[i] = normalise_name(&part[3..]);
        }
    }
    Some(lineage)
}

/// Whether every rank of the lineage is named
pub fn is_complete(lineage: &[String; 6]) -> bool {
    lineage.iter().all(|name| name != UNKNOWN_STR)
}

fn normalise_name(name: &str) -> String {
    let name = name.trim();
    if name.is_empty() || name.contains("unidentified") || name.contains("Incertae_sedis") {
        UNKNOWN_STR.to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lineage() {
        let header = "Morchella_esculenta|AB123|SH000.09FU|refs|k__Fungi;p__Ascomycota;c__Pezizomycetes;o__Pezizales;f__Morchellaceae;g__Morchella;s__Morchella_esculenta";
        let lineage = parse_unite_lineage(header).unwrap();
        assert_eq!(
            lineage,
            [
                "Ascomycota",
                "Pezizomycetes",
                "Pezizales",
                "Morchellaceae",
                "Morchella",
                "Morchella_esculenta"
            ]
            .map(String::from)
        );
        assert!(is_complete(&lineage));
    }

    #[test]
    fn test_placeholders_become_unknown() {
        let header = "x|y|k__Fungi;p__Ascomycota;c__Ascomycota_cls_Incertae_sedis;o__;f__unidentified;g__Foo;s__Foo_sp";
        let lineage = parse_unite_lineage(header).unwrap();
        assert_eq!(lineage[0], "Ascomycota");
        assert_eq!(lineage[1], UNKNOWN_STR);
        assert_eq!(lineage[2], UNKNOWN_STR);
        assert_eq!(lineage[3], UNKNOWN_STR);
        assert_eq!(lineage[4], "Foo");
        assert!(!is_complete(&lineage));
    }

    #[test]
    fn test_missing_ranks_and_no_lineage() {
        let lineage = parse_unite_lineage("id|k__Fungi;p__Mucoromycota").unwrap();
        assert_eq!(lineage[0], "Mucoromycota");
        assert!(lineage[1..].iter().all(|n| n == UNKNOWN_STR));

        assert!(parse_unite_lineage("plain_identifier").is_none());
    }
}
