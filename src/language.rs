//! Fence languages for rendered file contents.

/// Language tag used when nothing else matches.
pub const DEFAULT_LANGUAGE: &str = "text";

/// Code-fence language for a file, from its lowercase extension (without
/// the dot) or, for well-known dotfiles and build files, its name.
///
/// # Examples
///
/// ```
/// use gitingest::language::language_for;
///
/// assert_eq!(language_for(Some("rs"), "lib.rs"), "rust");
/// assert_eq!(language_for(None, "Makefile"), "makefile");
/// assert_eq!(language_for(Some("xyz"), "data.xyz"), "text");
/// ```
pub fn language_for(extension: Option<&str>, name: &str) -> &'static str {
    if let Some(language) = by_name(&name.to_lowercase()) {
        return language;
    }
    extension.and_then(by_extension).unwrap_or(DEFAULT_LANGUAGE)
}

fn by_name(name: &str) -> Option<&'static str> {
    let language = match name {
        ".gitignore" | ".dockerignore" | ".npmignore" | ".hgignore" | ".gitingestignore" => {
            "gitignore"
        }
        ".gitattributes" => "gitattributes",
        ".editorconfig" => "ini",
        ".eslintrc" | ".prettierrc" | ".babelrc" => "json",
        "dockerfile" => "dockerfile",
        "makefile" | "gnumakefile" => "makefile",
        _ => return None,
    };
    Some(language)
}

fn by_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "cc" | "cxx" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "dart" => "dart",
        "lua" => "lua",
        "r" => "r",
        "m" => "objective-c",
        "pl" => "perl",
        "sh" | "bash" => "bash",
        "zsh" => "zsh",
        "fish" => "fish",
        "sql" => "sql",
        "html" | "htm" => "html",
        "xml" => "xml",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "vue" => "vue",
        "svelte" => "svelte",
        "elm" => "elm",
        "hs" => "haskell",
        "ml" => "ocaml",
        "clj" => "clojure",
        "cljs" => "clojurescript",
        "ex" | "exs" => "elixir",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" | "cfg" | "conf" | "config" => "ini",
        "md" | "markdown" => "markdown",
        "rst" => "rst",
        "adoc" => "asciidoc",
        "tex" => "latex",
        "csv" => "csv",
        "tsv" => "tsv",
        "dockerfile" => "dockerfile",
        _ => return None,
    };
    Some(language)
}
