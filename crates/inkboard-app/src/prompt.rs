//! Interactive confirmation.

use std::io::{self, BufRead, Write};

/// Ask a yes/no question. Anything but `y` or `yes` is a no.
pub fn confirm(question: &str, mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    write!(output, "{} [y/N] ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_answers() {
        for (answer, expected) in [("y\n", true), ("YES\n", true), ("n\n", false), ("\n", false), ("", false)] {
            let mut out = Vec::new();
            assert_eq!(confirm("Are you sure?", answer.as_bytes(), &mut out).unwrap(), expected);
            assert_eq!(String::from_utf8(out).unwrap(), "Are you sure? [y/N] ");
        }
    }
}
