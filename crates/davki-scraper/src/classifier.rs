//! Keyword based classification of Slovenian tax texts.
//!
//! A [`KeywordTable`] groups keywords by [`TaxCategory`], a
//! [`TaxKeywordFilter`] compiles it once into case-insensitive whole word
//! matchers. Matching is presence only: a keyword counts once however often it
//! occurs.

use std::collections::BTreeSet;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Minimum number of distinct keywords for a text to be tax related.
pub const DEFAULT_MIN_MATCHES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaxCategory {
    Individual,
    SoleProprietor,
    Company,
    General,
}

impl TaxCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::SoleProprietor => "sole-proprietor",
            Self::Company => "company",
            Self::General => "general",
        }
    }
}

impl fmt::Display for TaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords grouped by category, in declaration order.
///
/// Declaration order matters: when two categories match the same number of
/// keywords, the one declared first wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    groups: Vec<(TaxCategory, Vec<String>)>,
}

impl KeywordTable {
    /// Adds keywords to `category`, declaring the category if it is new.
    pub fn with_group<I, S>(mut self, category: TaxCategory, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let idx = match self.groups.iter().position(|(c, _)| *c == category) {
            Some(idx) => idx,
            None => {
                self.groups.push((category, vec![]));
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[idx].1;
        for keyword in keywords {
            let keyword = keyword.into().trim().to_string();
            if !keyword.is_empty() && !group.contains(&keyword) {
                group.push(keyword);
            }
        }
        self
    }

    pub fn groups(&self) -> impl Iterator<Item = (TaxCategory, &[String])> {
        self.groups.iter().map(|(c, kws)| (*c, kws.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, kws)| kws.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The curated Slovenian vocabulary.
    pub fn builtin() -> Self {
        Self::default()
            .with_group(TaxCategory::Individual, INDIVIDUAL.iter().copied())
            .with_group(TaxCategory::SoleProprietor, SOLE_PROPRIETOR.iter().copied())
            .with_group(TaxCategory::Company, COMPANY.iter().copied())
            .with_group(TaxCategory::General, GENERAL.iter().copied())
    }
}

const INDIVIDUAL: &[&str] = &[
    "dohodnina",
    "dohodnine",
    "dohodnino",
    "napoved dohodnine",
    "informativni izračun",
    "informativni izračun dohodnine",
    "ugovor zoper informativni izračun",
    "splošna olajšava",
    "posebna olajšava",
    "olajšava za vzdrževane družinske člane",
    "vzdrževani družinski člani",
    "vzdrževanih družinskih članov",
    "dohodek iz zaposlitve",
    "dohodki iz zaposlitve",
    "plača",
    "pokojnina",
    "pokojnine",
    "oddajanje premoženja v najem",
    "dohodek iz oddajanja premoženja",
    "dobiček iz kapitala",
    "dobička iz kapitala",
    "obresti",
    "dividende",
    "davek na nepremičnine",
    "nadomestilo za uporabo stavbnega zemljišča",
    "davek na dediščine in darila",
    "dediščina",
    "darilo",
    "avtorski honorar",
    "avtorska pogodba",
    "podjemna pogodba",
    "študentsko delo",
    "fizična oseba",
    "fizične osebe",
    "zavezanec za dohodnino",
    "rezident",
    "nerezident",
];

const SOLE_PROPRIETOR: &[&str] = &[
    "samostojni podjetnik",
    "samostojnega podjetnika",
    "samostojni podjetniki",
    "s.p.",
    "popoldanski s.p.",
    "normiranec",
    "normiranci",
    "normirani odhodki",
    "normiranih odhodkov",
    "dejanski odhodki",
    "dejanskih odhodkov",
    "akontacija dohodnine",
    "akontacije dohodnine",
    "davčni obračun akontacije dohodnine",
    "dohodek iz dejavnosti",
    "dohodka iz dejavnosti",
    "ugotavljanje davčne osnove",
    "prispevki za socialno varnost",
    "obratovalnica",
    "sobodajalec",
    "dopolnilna dejavnost na kmetiji",
    "osebno dopolnilno delo",
];

const COMPANY: &[&str] = &[
    "davek od dohodkov pravnih oseb",
    "davka od dohodkov pravnih oseb",
    "DDPO",
    "pravna oseba",
    "pravne osebe",
    "pravnih oseb",
    "d.o.o.",
    "d.d.",
    "gospodarska družba",
    "gospodarske družbe",
    "davčni obračun DDPO",
    "transferne cene",
    "davek na dobiček",
    "davčna izguba",
    "investicijska olajšava",
    "olajšava za vlaganja v raziskave in razvoj",
    "davčni odtegljaj",
    "obdavčitev dobička",
    "konsolidirani obračun",
    "delodajalec",
    "delodajalci",
    "REK obrazec",
];

const GENERAL: &[&str] = &[
    "davek",
    "davki",
    "davka",
    "davkov",
    "davčni",
    "davčna",
    "davčne",
    "davčnih",
    "FURS",
    "finančna uprava",
    "finančne uprave",
    "DDV",
    "davek na dodano vrednost",
    "eDavki",
    "davčna številka",
    "davčni zavezanec",
    "davčni zavezanci",
    "davčni postopek",
    "davčna napoved",
    "davčna stopnja",
    "davčna blagajna",
    "vračilo davka",
    "zakon o davčnem postopku",
    "ZDavP-2",
    "trošarine",
    "carina",
    "obdavčitev",
];

/// Result of [`TaxKeywordFilter::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: TaxCategory,
    pub tax_topics: BTreeSet<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            category: TaxCategory::General,
            tax_topics: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct Matcher {
    keyword: String,
    regex: Regex,
}

impl Matcher {
    fn new(keyword: &str) -> Result<Self, regex::Error> {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';

        // `\b` only where the keyword edge is a word character, so that
        // abbreviations such as `s.p.` still match
        let mut pattern = String::new();
        if keyword.starts_with(is_word) {
            pattern.push_str(r"\b");
        }
        let words: Vec<_> = keyword.split_whitespace().map(regex::escape).collect();
        pattern.push_str(&words.join(r"\s+"));
        if keyword.ends_with(is_word) {
            pattern.push_str(r"\b");
        }

        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            keyword: keyword.to_string(),
            regex,
        })
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Classifies free text into a [`TaxCategory`] from a [`KeywordTable`].
#[derive(Debug, Clone)]
pub struct TaxKeywordFilter {
    table: KeywordTable,
    groups: Vec<(TaxCategory, Vec<Matcher>)>,
}

impl Default for TaxKeywordFilter {
    fn default() -> Self {
        Self::new(KeywordTable::builtin()).expect("Built-in keywords are escaped literals")
    }
}

impl TaxKeywordFilter {
    pub fn new(table: KeywordTable) -> Result<Self, regex::Error> {
        let groups = table
            .groups()
            .map(|(category, keywords)| {
                let matchers = keywords
                    .iter()
                    .map(|kw| Matcher::new(kw))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((category, matchers))
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { table, groups })
    }

    /// A new filter with `keywords` added to `category`, `self` is unchanged.
    pub fn with_keywords<I, S>(&self, category: TaxCategory, keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(self.table.clone().with_group(category, keywords))
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Picks the specific category with the most matched keywords, `General`
    /// when none of them matched.
    ///
    /// `tax_topics` holds the keywords matched in every group, `General`
    /// included.
    pub fn classify(&self, text: &str) -> Classification {
        if text.trim().is_empty() {
            return Classification::default();
        }

        let mut tax_topics = BTreeSet::new();
        let mut best: Option<(TaxCategory, usize)> = None;

        for (category, matchers) in &self.groups {
            let mut score = 0;
            for matcher in matchers.iter().filter(|m| m.is_match(text)) {
                score += 1;
                tax_topics.insert(matcher.keyword.clone());
            }

            if *category == TaxCategory::General || score == 0 {
                continue;
            }
            // Strictly greater, ties go to the first declared category
            if best.map_or(true, |(_, best_score)| score > best_score) {
                best = Some((*category, score));
            }
        }

        Classification {
            category: best.map_or(TaxCategory::General, |(category, _)| category),
            tax_topics,
        }
    }

    pub fn find_keywords(&self, text: &str) -> BTreeSet<String> {
        if text.trim().is_empty() {
            return BTreeSet::new();
        }
        self.groups
            .iter()
            .flat_map(|(_, matchers)| matchers)
            .filter(|m| m.is_match(text))
            .map(|m| m.keyword.clone())
            .collect()
    }

    pub fn is_tax_related(&self, text: &str, min_matches: usize) -> bool {
        self.find_keywords(text).len() >= min_matches
    }
}
