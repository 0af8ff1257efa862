use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, instrument};

use super::{Keyword, LogicalOp, ParseError, SearchTerm};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?x)
          (?P<bracketed>\w+\s*=\s*[(\[][^)\]]*[)\]])
        | (?P<keyed_quoted>\w+\s*[=:]\s*"[^"]*")
        | (?P<keyed>\w+\s*[=:]\s*[\w*?.\-]+)
        | "(?P<dq>[^"]*)"
        | '(?P<sq>[^']*)'
        | (?P<bare>[\w*?.\-]+)
        "#,
    )
    .expect("token pattern is valid")
});

static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)$").expect("number pattern is valid")
});

/// Unprefixed `x`, `y` or `un` read as words, not chromosomes.
static CHROMOSOME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^chr(?:\d+|x|y|m|mt|un)$").expect("chromosome pattern is valid")
});

static DENYLIST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i).*\W(href|http|sql|select|update)\W.*").expect("denylist pattern is valid")
});

/// True when the raw search string carries tokens associated with injection attempts.
pub fn is_suspicious(input: &str) -> bool {
    DENYLIST_RE.is_match(input)
}

/// Parses a raw search string into terms joined by `op`.
#[instrument(name = "Parse Terms", level = "debug", skip(input), fields(len = input.len()))]
pub fn parse(input: &str, op: LogicalOp) -> Result<Vec<SearchTerm>, ParseError> {
    if is_suspicious(input) {
        return Err(ParseError::Suspicious);
    }

    let mut terms: Vec<SearchTerm> = Vec::new();
    // Index of a keyed term that may still absorb bare operands.
    let mut open: Option<usize> = None;

    for caps in TOKEN_RE.captures_iter(input) {
        if let Some(m) = caps.name("bracketed") {
            let (key, rest) = split_key(m.as_str())?;
            let operands: Vec<&str> = rest
                .trim_matches(|c| matches!(c, '(' | ')' | '[' | ']'))
                .split_whitespace()
                .collect();
            if operands.is_empty() {
                return Err(ParseError::MissingOperand(key.to_string()));
            }
            terms.push(SearchTerm::keyed(key, operands));
            open = None;
        } else if let Some(m) = caps.name("keyed_quoted").or_else(|| caps.name("keyed")) {
            let (key, value) = split_key(m.as_str())?;
            let value = value.trim_matches('"').trim();
            if value.is_empty() {
                return Err(ParseError::MissingOperand(key.to_string()));
            }
            terms.push(SearchTerm::keyed(key, [value]));
            open = (key.max_arity() > 1 && caps.name("keyed").is_some()).then(|| terms.len() - 1);
        } else if let Some(phrase) = quoted(&caps) {
            if !phrase.trim().is_empty() {
                terms.push(SearchTerm::keyless(phrase.trim()));
            }
            open = None;
        } else if let Some(m) = caps.name("bare") {
            let token = m.as_str();
            if let Some(term) = open.and_then(|i| terms.get_mut(i))
                && let Some(key) = term.key
                && term.search_term.len() < key.max_arity()
                && extends(key, term.search_term.len(), token)
            {
                term.search_term.push(token.to_string());
                continue;
            }
            open = None;
            terms.push(SearchTerm::keyless(token));
        }
    }

    if terms.is_empty() {
        return Err(ParseError::Empty);
    }

    let last = terms.len() - 1;
    for (i, term) in terms.iter_mut().enumerate() {
        term.separator = (i < last).then_some(op);
    }
    debug!(terms = terms.len(), "Parsed search terms");
    Ok(terms)
}

/// Whether `token` can fill operand position `slot` of an open `key` term.
fn extends(key: Keyword, slot: usize, token: &str) -> bool {
    NUMBER_RE.is_match(token) || (key.chromosome_slot() == Some(slot) && CHROMOSOME_RE.is_match(token))
}

fn quoted<'h>(caps: &Captures<'h>) -> Option<&'h str> {
    caps.name("dq").or_else(|| caps.name("sq")).map(|m| m.as_str())
}

fn split_key(token: &str) -> Result<(Keyword, &str), ParseError> {
    let Some(pos) = token.find(['=', ':']) else {
        return Err(ParseError::UnknownKeyword(token.to_string()));
    };
    let key = token[..pos].parse::<Keyword>()?;
    Ok((key, token[pos + 1..].trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_and(input: &str) -> Vec<SearchTerm> {
        parse(input, LogicalOp::And).unwrap()
    }

    #[test]
    fn test_bare_words() {
        let terms = parse_and("shh grin2*");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0], SearchTerm::keyless("shh").with_separator(Some(LogicalOp::And)));
        assert_eq!(terms[1], SearchTerm::keyless("grin2*"));
    }

    #[test]
    fn test_space_separated_operands_are_absorbed() {
        let terms = parse("LRS=20 30", LogicalOp::Or).unwrap();
        assert_eq!(terms, vec![SearchTerm::keyed(Keyword::Lrs, ["20", "30"])]);

        let terms = parse_and("POSITION=chr1 10 20 shh");
        assert_eq!(
            terms[0].search_term,
            vec!["chr1".to_string(), "10".into(), "20".into()]
        );
        assert_eq!(terms[1].search_term, vec!["shh".to_string()]);
    }

    #[test]
    fn test_absorption_stops_at_max_arity() {
        let terms = parse_and("MEAN=5 10 15");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].search_term, vec!["5".to_string(), "10".into()]);
        assert_eq!(terms[1], SearchTerm::keyless("15"));
    }

    #[test]
    fn test_chromosome_words_only_fill_the_chromosome_slot() {
        let terms = parse_and("LRS=20 30 y");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].search_term, vec!["20".to_string(), "30".into()]);
        assert_eq!(terms[1], SearchTerm::keyless("y"));

        let terms = parse_and("LRS=9 18 chr2 100 120");
        assert_eq!(terms.len(), 1);
        assert_eq!(terms[0].operand_count(), 5);
        assert_eq!(terms[0].search_term[2], "chr2");

        let terms = parse_and("MEAN=5 chrX");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1], SearchTerm::keyless("chrX"));
    }

    #[test]
    fn test_bracketed_operands() {
        let terms = parse_and("LOD=(2 4 chr1 10 20) grin2b");
        assert_eq!(terms[0].key, Some(Keyword::Lod));
        assert_eq!(terms[0].operand_count(), 5);
        assert_eq!(terms[1].first(), Some("grin2b"));

        let terms = parse_and("mean=[1.5 3]");
        assert_eq!(terms[0], SearchTerm::keyed(Keyword::Mean, ["1.5", "3"]));
    }

    #[test]
    fn test_colon_keyword_and_quotes() {
        let terms = parse_and(r#"GO:0008150 "brain weight" WIKI="cell death""#);
        assert_eq!(terms[0], SearchTerm::keyed(Keyword::Go, ["0008150"]).with_separator(Some(LogicalOp::And)));
        assert_eq!(terms[1].first(), Some("brain weight"));
        assert_eq!(terms[1].key, None);
        assert_eq!(terms[2], SearchTerm::keyed(Keyword::Wiki, ["cell death"]));
    }

    #[test]
    fn test_single_arity_keyword_does_not_absorb() {
        let terms = parse_and("RIF=diabetes 10");
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[1], SearchTerm::keyless("10"));
    }

    #[test]
    fn test_unknown_keyword() {
        assert_eq!(
            parse("CISLRS=(10 20)", LogicalOp::And),
            Err(ParseError::UnknownKeyword("CISLRS".into()))
        );
    }

    #[test]
    fn test_empty_and_suspicious_input() {
        assert_eq!(parse("   ", LogicalOp::And), Err(ParseError::Empty));
        assert!(is_suspicious("shh <a href='x'>"));
        assert!(is_suspicious("1; SELECT * FROM users"));
        assert!(!is_suspicious("selective shh"));
        assert_eq!(
            parse("x' OR 1=1; update users", LogicalOp::And),
            Err(ParseError::Suspicious)
        );
    }
}
