use indexmap::IndexMap;
use serde::Serialize;

use crate::grammar::BuiltGrammar;

/// What a successful parse produced: the selected command and the value of
/// every sink visible along its path.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseReport {
    pub app: String,
    pub command: String,
    pub values: IndexMap<String, serde_json::Value>,
}

impl ParseReport {
    /// Keys are `--flag` / `<arg>` at the root and `<command path> --flag`
    /// below it, so sibling commands reusing a name stay distinct.
    pub fn collect(built: &BuiltGrammar, command: &str) -> Self {
        let mut values = IndexMap::new();
        for entry in built.sinks.iter().filter(|e| in_path(&e.scope, command)) {
            let key = if entry.scope.is_empty() {
                entry.key.clone()
            } else {
                format!("{} {}", entry.scope, entry.key)
            };
            values.insert(key, entry.sink.to_json());
        }
        Self {
            app: built.app.name().to_string(),
            command: command.to_string(),
            values,
        }
    }

    pub fn print_human(&self) {
        if self.command.is_empty() {
            println!("command: (none)");
        } else {
            println!("command: {}", self.command);
        }
        let width = self.values.keys().map(|k| k.len()).max().unwrap_or(0);
        for (key, value) in &self.values {
            println!("  {key:width$}  {value}");
        }
    }
}

/// Whether `scope` is the root, `command` itself or one of its ancestors.
fn in_path(scope: &str, command: &str) -> bool {
    if scope.is_empty() || scope == command {
        return true;
    }
    command
        .strip_prefix(scope)
        .is_some_and(|rest| rest.starts_with(' '))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarFile;

    fn grammar() -> GrammarFile {
        serde_json::from_str(
            r#"{
  "name": "tool",
  "flags": [{ "name": "verbose", "short": "v", "type": "counter" }],
  "commands": [
    { "name": "remote", "flags": [{ "name": "dry-run", "type": "bool" }], "commands": [
      { "name": "add", "args": [{ "name": "url", "required": true }] }
    ]},
    { "name": "remotes", "flags": [{ "name": "dry-run", "type": "bool" }] }
  ]
}"#,
        )
        .unwrap()
    }

    #[test]
    fn scope_matching_respects_word_boundaries() {
        assert!(in_path("", "remote add"));
        assert!(in_path("remote", "remote add"));
        assert!(in_path("remote add", "remote add"));
        assert!(!in_path("remote", "remotes"));
        assert!(!in_path("remote add", "remote"));
    }

    #[test]
    fn report_covers_the_selected_path_only() {
        let mut built = grammar().build().unwrap();
        built
            .app
            .parse(&["-vv", "remote", "add", "--dry-run", "git@host"])
            .unwrap();

        let report = ParseReport::collect(&built, "remote add");
        let keys: Vec<_> = report.values.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["--verbose", "remote --dry-run", "remote add <url>"]);
        assert_eq!(report.values["--verbose"], serde_json::json!(2));
        assert_eq!(report.values["remote --dry-run"], serde_json::json!(true));
        assert_eq!(report.values["remote add <url>"], serde_json::json!("git@host"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["app"], "tool");
        assert_eq!(json["command"], "remote add");
    }
}
