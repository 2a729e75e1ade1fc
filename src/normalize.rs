use crate::config::Text;
use anyhow::Result;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Canonical form for text leaving the process: LF line endings, Unicode NFC.
pub fn canonicalize(s: &str) -> String {
    s.replace("\r\n", "\n").nfc().collect()
}

/// Tidies extracted text before it is shown or analysed.
pub fn tidy_extracted(cfg: &Text, s: &str) -> Result<String> {
    let mut out = s.to_string();

    if cfg.normalize_newlines {
        out = out.replace("\r\n", "\n").replace('\r', "\n");
    }

    if cfg.normalize_unicode {
        out = out.nfc().collect::<String>();
    }

    out = sanitize_control_chars(&out, &cfg.control_chars_to_sanitize);

    if cfg.trim_trailing_whitespace {
        out = out
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
    }

    if cfg.collapse_blank_lines {
        out = collapse_blank_lines(&out, cfg.max_consecutive_blank_lines)?;
    }

    Ok(out)
}

fn sanitize_control_chars(s: &str, codes: &[u8]) -> String {
    if codes.is_empty() {
        return s.to_string();
    }

    let mut mask = [false; 128];
    for &code in codes {
        if (code as usize) < mask.len() {
            mask[code as usize] = true;
        }
    }

    s.chars()
        .filter(|&ch| {
            if ch == '\n' || ch == '\t' {
                return true;
            }
            let cp = ch as u32;
            cp >= 128 || !mask[cp as usize]
        })
        .collect()
}

fn collapse_blank_lines(s: &str, max_blank: u32) -> Result<String> {
    let re = Regex::new(r"\n(?:[ \t]*\n)+")?;

    let keep = "\n".repeat(max_blank as usize + 1);
    let out = re.replace_all(s, |caps: &regex::Captures<'_>| {
        let newlines = caps[0].matches('\n').count();
        if newlines > max_blank as usize + 1 {
            keep.clone()
        } else {
            caps[0].to_string()
        }
    });
    Ok(out.into_owned())
}
