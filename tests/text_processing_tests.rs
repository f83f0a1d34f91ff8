#[cfg(test)]
mod tests {
    use nutrilabel::parser_config::ParserConfig;
    use nutrilabel::text_processing::{normalize, LineIndex, SectionIsolator, SectionOrigin};

    const TABLE: &str = "Biscotti frollini\nIngredienti: farina, zucchero\nValori nutrizionali\nPer 100 g\nEnergia 1900 kJ / 450 kcal\nGrassi 18 g\nCarboidrati 65 g\nProteine 7 g\nSale 0,4 g";

    #[test]
    fn test_normalize_collapses_and_lowercases() {
        assert_eq!(
            normalize("CARBOIDRATI   30,5\tG\r\n"),
            "carboidrati 30,5 g\n"
        );
    }

    #[test]
    fn test_marker_variants() {
        let isolator = SectionIsolator::new(1600, 1);
        for text in ["per 100g", "per 100 gr", "per 100 ml", "per100m1", "valoriper 100g"] {
            let section = isolator.isolate(text);
            assert!(section.is_isolated(), "{text}");
        }
        assert!(!isolator.isolate("per porzione 30 g").is_isolated());
    }

    #[test]
    fn test_glued_marker_isolates_section() {
        let normalized = normalize("Valoriper 100g\nEnergia 250 kcal\nGrassi 10 g\nProteine 5 g");
        let section = SectionIsolator::from_config(&ParserConfig::default()).isolate(&normalized);
        assert_eq!(section.origin(), SectionOrigin::Marker { offset: 6 });
        assert!(section.text().starts_with("per 100g"));
    }

    #[test]
    fn test_sufficient_window_isolates_table() {
        let normalized = normalize(TABLE);
        let section = SectionIsolator::from_config(&ParserConfig::default()).isolate(&normalized);

        assert!(section.is_isolated());
        assert!(matches!(section.origin(), SectionOrigin::Marker { .. }));
        assert!(section.text().starts_with("per 100 g"));
        assert!(!section.text().contains("biscotti"));
        assert!(section.text().ends_with("sale 0,4 g"));
    }

    #[test]
    fn test_too_small_window_falls_back() {
        let normalized = normalize(TABLE);
        let section = SectionIsolator::new(20, 4).isolate(&normalized);

        assert!(!section.is_isolated());
        assert!(matches!(section.origin(), SectionOrigin::SparseFallback { .. }));
        assert_eq!(section.text(), normalized);
    }

    #[test]
    fn test_run_on_line_falls_back() {
        let normalized = normalize("per 100 g carboidrati 30 g proteine 5 g grassi 10 g");
        let section = SectionIsolator::new(1600, 4).isolate(&normalized);
        assert_eq!(section.origin(), SectionOrigin::SparseFallback { offset: 0 });
    }

    #[test]
    fn test_line_index_drops_blank_lines() {
        let lines = LineIndex::new("  Carboidrati \n\n   \n 12 g ");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines.get(0), Some("carboidrati"));
        assert_eq!(lines.get(1), Some("12 g"));
        assert_eq!(lines.get(2), None);
        assert!(LineIndex::new("\n\n").is_empty());
    }
}
