use std::sync::LazyLock;

use regex::Regex;

/// Annotations that only ever appear inside parentheses or brackets
const BRACKETED: &[&str] = &[
    r"official\s*(?:music\s*video|lyric\s*video|video|audio)",
    r"lyrics?",
    r"live\s*(?:performance|version|at)[^\)\]]*",
    r"acoustic\s*(?:version)?",
    r"cover\s*(?:version)?",
    r"remix",
    r"karaoke",
    r"instrumental",
    r"extended\s*(?:version|mix)?",
    r"radio\s*(?:edit|version)?",
    r"clean\s*(?:version)?",
    r"explicit\s*(?:version)?",
    r"remastered",
    r"\d{4}",
    r"hd",
    r"4k",
    r"60fps",
];

/// Annotations that may also trail the title after a dash or a pipe
const TRAILING: &[&str] = &[
    r"(?:official\s*)?(?:music\s*video|lyric\s*video|video|audio)",
    r"lyrics?",
];

static PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let bracketed = BRACKETED.iter().map(|inner| {
        format!(r"(?i)\s*(?:\(\s*{inner}\s*\)|\[\s*{inner}\s*\])", inner = inner)
    });
    let trailing = TRAILING
        .iter()
        .map(|inner| format!(r"(?i)\s*[-|]\s*{}\s*$", inner));
    bracketed
        .chain(trailing)
        .map(|p| Regex::new(&p).expect("annotation patterns are valid"))
        .collect()
});

/// Strip video annotations such as "(Official Video)", "[Lyrics]" or "| HD"
///
/// Patterns are applied until none of them matches anymore, so the result is a
/// fixed point: cleaning it again returns it unchanged.
pub fn clean_title(title: &str) -> String {
    let mut current = title.trim().to_string();
    loop {
        let mut next = current.clone();
        for re in PATTERNS.iter() {
            next = re.replace_all(&next, "").trim().to_string();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}
