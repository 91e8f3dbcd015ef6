//! Structured WHERE-clause builder. User text never reaches the SQL string:
//! each predicate renders a placeholder and pushes its value onto the
//! parameter list that is later bound with `params_from_iter`.

use rusqlite::types::Value;

use crate::text::unaccent;

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `column LIKE pattern ESCAPE '\'`.
    Like {
        column: &'static str,
        pattern: String,
    },
    /// `column IN (...)`; always false when `ids` is empty.
    In {
        column: &'static str,
        ids: Vec<i64>,
    },
    /// `column NOT IN (...)`; always true when `ids` is empty.
    NotIn {
        column: &'static str,
        ids: Vec<i64>,
    },
    /// OR of the inner predicates; always false when empty.
    Any(Vec<Predicate>),
    /// AND of the inner predicates; always true when empty.
    All(Vec<Predicate>),
}

impl Predicate {
    /// Matches rows whose `column` contains `word` anywhere.
    pub fn contains(column: &'static str, word: &str) -> Self {
        Predicate::Like {
            column,
            pattern: format!("%{}%", escape_like(word)),
        }
    }

    /// Matches rows whose `column` starts with `word`.
    pub fn starts_with(column: &'static str, word: &str) -> Self {
        Predicate::Like {
            column,
            pattern: format!("{}%", escape_like(word)),
        }
    }

    pub fn is_in(column: &'static str, ids: &[i64]) -> Self {
        Predicate::In {
            column,
            ids: ids.to_vec(),
        }
    }

    pub fn not_in(column: &'static str, ids: &[i64]) -> Self {
        Predicate::NotIn {
            column,
            ids: ids.to_vec(),
        }
    }

    /// Render to SQL, appending bound values to `params`. Placeholders are
    /// numbered from the current length of `params`, so several predicates
    /// can share one parameter list.
    pub fn render(&self, params: &mut Vec<Value>) -> String {
        match self {
            Predicate::Like { column, pattern } => {
                params.push(Value::Text(pattern.clone()));
                format!("{column} LIKE ?{} ESCAPE '\\'", params.len())
            }
            Predicate::In { ids, .. } if ids.is_empty() => "0".to_string(),
            Predicate::In { column, ids } => {
                format!("{column} IN ({})", placeholders(ids, params))
            }
            Predicate::NotIn { ids, .. } if ids.is_empty() => "1".to_string(),
            Predicate::NotIn { column, ids } => {
                format!("{column} NOT IN ({})", placeholders(ids, params))
            }
            Predicate::Any(inner) if inner.is_empty() => "0".to_string(),
            Predicate::Any(inner) => join(inner, " OR ", params),
            Predicate::All(inner) if inner.is_empty() => "1".to_string(),
            Predicate::All(inner) => join(inner, " AND ", params),
        }
    }
}

fn join(inner: &[Predicate], separator: &str, params: &mut Vec<Value>) -> String {
    let parts = inner
        .iter()
        .map(|p| p.render(params))
        .collect::<Vec<_>>()
        .join(separator);
    format!("({parts})")
}

fn placeholders(ids: &[i64], params: &mut Vec<Value>) -> String {
    ids.iter()
        .map(|id| {
            params.push(Value::Integer(*id));
            format!("?{}", params.len())
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Escape the LIKE metacharacters so user input matches literally.
fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Search text split on whitespace, each word folded with `unaccent`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchWords(Vec<String>);

impl SearchWords {
    pub fn parse(text: &str) -> Self {
        SearchWords(text.split_whitespace().map(unaccent).collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    /// A row matches when ANY word is contained in ANY of `columns`.
    /// `None` when there are no words, meaning "no filter".
    pub fn any_contained_in(&self, columns: &[&'static str]) -> Option<Predicate> {
        if self.is_empty() {
            return None;
        }
        let clauses = self
            .0
            .iter()
            .flat_map(|word| {
                columns
                    .iter()
                    .map(move |column| Predicate::contains(*column, word))
            })
            .collect();
        Some(Predicate::Any(clauses))
    }
}

/// Render an optional predicate as a `WHERE ...` suffix.
pub fn where_clause(predicate: Option<&Predicate>, params: &mut Vec<Value>) -> String {
    predicate
        .map(|p| format!("WHERE {}", p.render(params)))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_any_word_clause_with_placeholders() {
        let words = SearchWords::parse("Long  Sóng");
        let predicate = words
            .any_contained_in(&["song.unaccented_name", "artist.unaccented_name"])
            .unwrap();
        let mut params = Vec::new();
        let sql = predicate.render(&mut params);

        assert_eq!(
            sql,
            "(song.unaccented_name LIKE ?1 ESCAPE '\\' OR artist.unaccented_name LIKE ?2 ESCAPE '\\' \
             OR song.unaccented_name LIKE ?3 ESCAPE '\\' OR artist.unaccented_name LIKE ?4 ESCAPE '\\')"
        );
        assert_eq!(
            params,
            vec![
                Value::Text("%long%".into()),
                Value::Text("%long%".into()),
                Value::Text("%song%".into()),
                Value::Text("%song%".into()),
            ]
        );
    }

    #[test]
    fn empty_search_has_no_predicate() {
        let words = SearchWords::parse("   ");
        assert!(words.is_empty());
        assert!(words.any_contained_in(&["song.unaccented_name"]).is_none());

        let mut params = Vec::new();
        assert_eq!(where_clause(None, &mut params), "");
    }

    #[test]
    fn empty_lists_render_neutral_clauses() {
        let mut params = Vec::new();
        assert_eq!(Predicate::not_in("artist.id", &[]).render(&mut params), "1");
        assert_eq!(Predicate::is_in("artist_id", &[]).render(&mut params), "0");
        assert_eq!(Predicate::Any(vec![]).render(&mut params), "0");
        assert_eq!(Predicate::All(vec![]).render(&mut params), "1");
        assert!(params.is_empty());
    }

    #[test]
    fn not_in_continues_numbering() {
        let mut params = vec![Value::Integer(0)];
        let sql = Predicate::All(vec![
            Predicate::starts_with("artist.unaccented_name", "ana"),
            Predicate::not_in("artist.id", &[3, 4]),
        ])
        .render(&mut params);

        assert_eq!(
            sql,
            "(artist.unaccented_name LIKE ?2 ESCAPE '\\' AND artist.id NOT IN (?3, ?4))"
        );
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(
            Predicate::contains("c", "50%_off"),
            Predicate::Like {
                column: "c",
                pattern: "%50\\%\\_off%".into()
            }
        );
    }
}
