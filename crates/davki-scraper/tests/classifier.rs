use std::collections::BTreeSet;

use davki_scraper::{KeywordTable, TaxCategory, TaxKeywordFilter};

fn topics(words: &[&str]) -> BTreeSet<String> {
    words.iter().map(|w| w.to_string()).collect()
}

#[test]
fn empty_text_is_general() {
    let filter = TaxKeywordFilter::default();

    for text in ["", "   ", "\n\t "] {
        let classification = filter.classify(text);
        assert_eq!(TaxCategory::General, classification.category);
        assert!(classification.tax_topics.is_empty());
    }
}

#[test]
fn builtin_table_covers_every_category() {
    let table = KeywordTable::builtin();

    let categories: Vec<_> = table.groups().map(|(category, _)| category).collect();
    assert_eq!(
        vec![
            TaxCategory::Individual,
            TaxCategory::SoleProprietor,
            TaxCategory::Company,
            TaxCategory::General,
        ],
        categories
    );
    assert!(table.groups().all(|(_, keywords)| !keywords.is_empty()));
    assert!(table
        .groups()
        .any(|(_, keywords)| keywords.iter().any(|k| k == "dohodnina")));
}

#[test]
fn income_tax_return_is_individual() {
    let filter = TaxKeywordFilter::default();

    let classification = filter.classify("Moram oddati napoved dohodnine do konca marca.");

    assert_eq!(TaxCategory::Individual, classification.category);
    assert!(classification.tax_topics.contains("napoved dohodnine"));
    assert!(classification.tax_topics.contains("dohodnine"));
}

#[test]
fn single_category_keywords_select_that_category() {
    let filter = TaxKeywordFilter::default();

    assert_eq!(
        TaxCategory::SoleProprietor,
        filter.classify("Vsak normiranec mora paziti na rok.").category
    );
    assert_eq!(
        TaxCategory::Company,
        filter.classify("Gospodarska družba mora oddati obračun.").category
    );
    assert_eq!(
        TaxCategory::Individual,
        filter.classify("Pokojnina je bila izplačana.").category
    );
}

#[test]
fn general_keywords_only_stay_general() {
    let filter = TaxKeywordFilter::default();

    let classification = filter.classify("FURS je objavila novo davčno stopnjo za DDV.");

    assert_eq!(TaxCategory::General, classification.category);
    assert_eq!(topics(&["DDV", "FURS"]), classification.tax_topics);
}

#[test]
fn matching_is_case_insensitive_and_whole_word() {
    let filter = TaxKeywordFilter::default();

    assert_eq!(topics(&["dohodnina"]), filter.find_keywords("DOHODNINA"));
    assert_eq!(topics(&["dohodnina"]), filter.find_keywords("Dohodnina, letos"));
    // Prefix of a longer word
    assert!(filter.find_keywords("fursa").is_empty());
    assert!(filter.find_keywords("dohodninaxyz").is_empty());
}

#[test]
fn abbreviations_match() {
    let filter = TaxKeywordFilter::default();

    let found = filter.find_keywords("Lastnik podjetja Kovač s.p. in družbe Les d.o.o. je prišel.");
    assert!(found.contains("s.p."));
    assert!(found.contains("d.o.o."));
}

#[test]
fn phrases_match_across_whitespace() {
    let filter = TaxKeywordFilter::default();

    assert!(filter
        .find_keywords("napoved\n   dohodnine")
        .contains("napoved dohodnine"));
}

#[test]
fn most_matches_wins() {
    let filter = TaxKeywordFilter::default();

    let classification =
        filter.classify("Normiranec, ki je samostojni podjetnik, uveljavlja normirani odhodki. Plača.");

    assert_eq!(TaxCategory::SoleProprietor, classification.category);
    assert!(classification.tax_topics.contains("plača"));
}

#[test]
fn ties_go_to_first_declared_category() {
    let table = KeywordTable::default()
        .with_group(TaxCategory::Company, ["alfa"])
        .with_group(TaxCategory::Individual, ["beta"]);
    let filter = TaxKeywordFilter::new(table).unwrap();

    assert_eq!(TaxCategory::Company, filter.classify("beta alfa").category);
}

#[test]
fn find_keywords_is_idempotent() {
    let filter = TaxKeywordFilter::default();
    let text = "Akontacija dohodnine za s.p. in davek na dobiček za d.o.o.";

    assert_eq!(filter.find_keywords(text), filter.find_keywords(text));
    assert!(!filter.find_keywords(text).is_empty());
}

#[test]
fn tax_related_counts_distinct_keywords() {
    let filter = TaxKeywordFilter::default();

    assert!(filter.is_tax_related("Rok za dohodnina je blizu.", 1));
    assert!(!filter.is_tax_related("Rok za dohodnina je blizu.", 2));
    assert!(!filter.is_tax_related("Vreme bo jutri sončno.", 1));
    assert!(filter.is_tax_related("dohodnina dohodnina DDV", 2));
    assert!(!filter.is_tax_related("dohodnina dohodnina dohodnina", 2));
}

#[test]
fn with_keywords_returns_new_filter() {
    let filter = TaxKeywordFilter::default();
    let extended = filter
        .with_keywords(TaxCategory::Company, ["kriptovalute"])
        .unwrap();

    assert!(filter.find_keywords("kriptovalute").is_empty());
    assert_eq!(topics(&["kriptovalute"]), extended.find_keywords("Kriptovalute"));
    assert_eq!(TaxCategory::Company, extended.classify("kriptovalute").category);
    assert_eq!(filter.table().len() + 1, extended.table().len());
}

#[test]
fn custom_table_ignores_blank_and_duplicate_keywords() {
    let table = KeywordTable::default().with_group(TaxCategory::General, ["davek", " ", "davek"]);

    assert_eq!(1, table.len());
}
