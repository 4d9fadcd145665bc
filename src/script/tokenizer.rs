//! Tolerant normalizer for hand-written locking scripts
//!
//! Puzzle write-ups paste scripts with labels (`Pkscript`, `Witness`),
//! address metadata lines, hyphenated or line-wrapped opcodes (`OP_CH` /
//! `ECKSIG`) and hex pushes split over several lines. This stage turns
//! such text into a clean token stream; it never decides the script type.

use log::{debug, trace};

use super::opcode::{self, Opcode};
use super::RecognizeError;
use crate::constants::HASH160_LEN;

/// A normalized script word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A recognized opcode
    Op(Opcode),
    /// An opcode mnemonic outside the recognized set, kept so that the
    /// script fails to match any template instead of being misread
    UnknownOp(String),
    /// Explicit push marker (`OP_PUSHBYTES_<n>`)
    PushLen(usize),
    /// A hex fragment, lower-cased; adjacent fragments form one push
    Data(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Label {
    Start,
    End,
}

const START_LABELS: &[&str] = &["PKSCRIPT", "SCRIPTPUBKEY", "LOCKINGSCRIPT", "OUTPUTSCRIPT"];
const END_LABELS: &[&str] = &["WITNESS", "SIGSCRIPT", "SCRIPTSIG", "UNLOCKINGSCRIPT", "ADDRESS"];

fn label(clean: &str) -> Option<Label> {
    if START_LABELS.contains(&clean) {
        Some(Label::Start)
    } else if END_LABELS.contains(&clean) {
        Some(Label::End)
    } else {
        None
    }
}

/// Replace literal `\n`, `\r`, `\t` sequences with the characters they name
fn expand_escapes(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\r", "\r").replace("\\t", "\t")
}

/// Drop everything after a `#`
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| ",;:\"'()[]{}<>".contains(c))
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hex words shorter than a hash160 seen before the body may be prose
/// (`Puzzle 66`, `Block 170`)
const PROVISIONAL_HEX_LEN: usize = 2 * HASH160_LEN;

/// Opcodes that open one of the recognized templates
fn opens_template(token: &Token) -> bool {
    matches!(
        token,
        Token::Op(Opcode::Dup | Opcode::Hash160 | Opcode::Op0 | Opcode::Op1 | Opcode::Num(_))
    )
}

/// Buffered opcode fragment waiting for its continuation
struct Pending {
    clean: String,
    raw: Vec<String>,
}

struct Normalizer {
    tokens: Vec<Token>,
    pending: Option<Pending>,
    /// Short hex words before the body, kept until the next token shows
    /// whether they are data or metadata
    provisional: Vec<String>,
    skipping: bool,
}

impl Normalizer {
    fn new() -> Self {
        Self {
            tokens: Vec::new(),
            pending: None,
            provisional: Vec::new(),
            skipping: false,
        }
    }

    fn body_started(&self) -> bool {
        !self.tokens.is_empty()
    }

    /// Append a token, settling any provisional hex first
    fn push(&mut self, token: Token) {
        if !self.provisional.is_empty() {
            if opens_template(&token) {
                trace!("dropping leading metadata {:?}", self.provisional);
                self.provisional.clear();
            } else {
                let words = std::mem::take(&mut self.provisional);
                self.tokens.extend(words.into_iter().map(Token::Data));
            }
        }
        self.tokens.push(token);
    }

    fn drop_provisional(&mut self, reason: &str) {
        if !self.provisional.is_empty() {
            trace!("dropping {:?} before {}", self.provisional, reason);
            self.provisional.clear();
        }
    }

    /// Emit a buffered fragment that cannot be extended further
    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            match Opcode::from_clean(&pending.clean) {
                Some(op) => self.push(Token::Op(op)),
                None if self.body_started() => {
                    debug!("dangling opcode fragment: {}", pending.raw.join(" "));
                    self.push(Token::UnknownOp(pending.raw.join(" ")));
                }
                None => trace!("skipping metadata word {:?}", pending.raw.join(" ")),
            }
        }
    }

    fn word(&mut self, raw: &str) -> Result<(), RecognizeError> {
        let mut word = trim_punctuation(raw);
        if let Some(stripped) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
            if is_hex(stripped) {
                word = stripped;
            }
        }
        let clean = opcode::clean(word);
        if clean.is_empty() {
            return Ok(());
        }

        if let Some(pending) = self.pending.take() {
            let joined = format!("{}{}", pending.clean, clean);
            if Opcode::from_clean(&joined).is_some() || Opcode::is_partial(&joined) {
                let mut raw_parts = pending.raw;
                raw_parts.push(word.to_string());
                trace!("joining opcode fragments {:?}", raw_parts);
                let complete = !Opcode::is_partial(&joined);
                self.pending = Some(Pending { clean: joined, raw: raw_parts });
                if complete {
                    self.flush_pending();
                }
                return Ok(());
            }
            self.pending = Some(pending);
            self.flush_pending();
        }

        match label(&clean) {
            Some(Label::Start) => {
                if !self.tokens.is_empty() {
                    trace!("discarding {} tokens before {}", self.tokens.len(), word);
                }
                self.tokens.clear();
                self.provisional.clear();
                self.skipping = false;
                return Ok(());
            }
            Some(Label::End) if self.body_started() => {
                trace!("script body ends at label {}", word);
                self.skipping = true;
                return Ok(());
            }
            _ => {}
        }
        if self.skipping {
            return Ok(());
        }

        self.classify(word, clean)
    }

    fn classify(&mut self, word: &str, clean: String) -> Result<(), RecognizeError> {
        if clean.starts_with("OP") {
            if Opcode::is_partial(&clean) {
                self.pending = Some(Pending { clean, raw: vec![word.to_string()] });
            } else if let Some(op) = Opcode::from_clean(&clean) {
                self.push(Token::Op(op));
            } else if let Some(len) = opcode::pushbytes_len(&clean) {
                self.push(Token::PushLen(len));
            } else if self.body_started() || word.contains(['_', '-']) {
                self.push(Token::UnknownOp(word.to_ascii_uppercase()));
            } else {
                trace!("skipping metadata word {:?}", word);
                self.drop_provisional(word);
            }
            return Ok(());
        }

        if is_hex(&clean) {
            let data = clean.to_ascii_lowercase();
            if !self.body_started() && data.len() < PROVISIONAL_HEX_LEN {
                self.provisional.push(data);
            } else {
                self.push(Token::Data(data));
            }
            return Ok(());
        }

        if self.body_started() {
            return Err(RecognizeError::MalformedHex(format!(
                "unexpected token {:?} in script body",
                word
            )));
        }
        trace!("skipping metadata word {:?}", word);
        self.drop_provisional(word);
        Ok(())
    }

    fn finish(mut self) -> Vec<Token> {
        self.flush_pending();
        let words = std::mem::take(&mut self.provisional);
        self.tokens.extend(words.into_iter().map(Token::Data));
        self.tokens
    }
}

/// Normalize free-form script text into tokens
pub fn normalize(text: &str) -> Result<Vec<Token>, RecognizeError> {
    let expanded = expand_escapes(text);
    let mut normalizer = Normalizer::new();

    for line in expanded.lines() {
        for raw in strip_comment(line).split_whitespace() {
            normalizer.word(raw)?;
        }
    }

    let tokens = normalizer.finish();
    debug!("normalized script into {} tokens", tokens.len());
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(tokens: &[Token]) -> Vec<String> {
        tokens
            .iter()
            .map(|t| match t {
                Token::Op(op) => op.name().to_string(),
                Token::UnknownOp(s) => format!("?{}", s),
                Token::PushLen(n) => format!("push{}", n),
                Token::Data(d) => d.clone(),
            })
            .collect()
    }

    #[test]
    fn test_plain_p2pkh() {
        let tokens = normalize(
            "OP_DUP OP_HASH160 11ed988147e4760688a0df3b1df0d70fd1d4f3ec OP_EQUALVERIFY OP_CHECKSIG",
        )
        .unwrap();
        assert_eq!(
            ops(&tokens),
            vec![
                "OP_DUP",
                "OP_HASH160",
                "11ed988147e4760688a0df3b1df0d70fd1d4f3ec",
                "OP_EQUALVERIFY",
                "OP_CHECKSIG"
            ]
        );
    }

    #[test]
    fn test_split_checksig_variants() {
        for split in ["OP_CH\nECKSIG", "OP\nCHECKSIG", "OP-CHECK\nS-IG", "OP_CHECK SIG"] {
            let tokens = normalize(split).unwrap();
            assert_eq!(tokens, vec![Token::Op(Opcode::CheckSig)], "input {:?}", split);
        }
    }

    #[test]
    fn test_equal_followed_by_verify_fragment() {
        let tokens = normalize("OP_EQUAL\nVERIFY OP_CHECKSIG").unwrap();
        assert_eq!(
            tokens,
            vec![Token::Op(Opcode::EqualVerify), Token::Op(Opcode::CheckSig)]
        );
        let tokens = normalize("OP_EQUAL").unwrap();
        assert_eq!(tokens, vec![Token::Op(Opcode::Equal)]);
    }

    #[test]
    fn test_labels_scope_the_body() {
        let text = "bc1qr2cr3-xu7txc2de\nPkscript\n00141ab038be420532ef6419408002f21df7a79c9b9e\nWitness\n3044,03a5\nfea9";
        let tokens = normalize(text).unwrap();
        assert_eq!(
            tokens,
            vec![Token::Data("00141ab038be420532ef6419408002f21df7a79c9b9e".to_string())]
        );
    }

    #[test]
    fn test_comments_and_escapes() {
        let text = "# puzzle 66\\nOP_0 # witness v0\\n5274f5b99c72561a3da2adf720dc8e2cd6eee497";
        let tokens = normalize(text).unwrap();
        assert_eq!(
            ops(&tokens),
            vec!["OP_0", "5274f5b99c72561a3da2adf720dc8e2cd6eee497"]
        );
    }

    #[test]
    fn test_unknown_opcode_is_kept() {
        let tokens = normalize("OP_RETURN deadbeef").unwrap();
        assert_eq!(ops(&tokens), vec!["?OP_RETURN", "deadbeef"]);
    }

    #[test]
    fn test_dangling_fragment() {
        let tokens = normalize("OP_DUP OP_CH").unwrap();
        assert_eq!(ops(&tokens), vec!["OP_DUP", "?OP_CH"]);
    }

    #[test]
    fn test_garbage_in_body_is_malformed_hex() {
        let result = normalize("OP_DUP OP_HASH160 not-a-hash OP_EQUALVERIFY");
        assert!(matches!(result, Err(RecognizeError::MalformedHex(_))));
    }

    #[test]
    fn test_pushbytes_marker_and_hex_prefix() {
        let tokens =
            normalize("OP_0 OP_PUSHBYTES_20 0x5274f5b99c72561a3da2adf720dc8e2cd6eee497").unwrap();
        assert_eq!(
            ops(&tokens),
            vec!["OP_0", "push20", "5274f5b99c72561a3da2adf720dc8e2cd6eee497"]
        );
    }

    #[test]
    fn test_leading_numbers_are_metadata() {
        for text in [
            "Puzzle 66\nOP_DUP OP_HASH160 11ed988147e4760688a0df3b1df0d70fd1d4f3ec",
            "Block 170\nOP_DUP OP_HASH160 11ed988147e4760688a0df3b1df0d70fd1d4f3ec",
            "66 solved\n0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798",
        ] {
            let tokens = normalize(text).unwrap();
            assert!(
                !tokens.contains(&Token::Data("66".to_string()))
                    && !tokens.contains(&Token::Data("170".to_string())),
                "input {:?} kept {:?}",
                text,
                tokens
            );
        }
    }

    #[test]
    fn test_short_leading_hex_kept_as_data() {
        let tokens = normalize("06f61b94f0e562e41e71\n37a8b0aa78db61029257").unwrap();
        assert_eq!(
            ops(&tokens),
            vec!["06f61b94f0e562e41e71", "37a8b0aa78db61029257"]
        );

        let tokens = normalize("0 5274f5b99c72561a3da2adf720dc8e2cd6eee497").unwrap();
        assert_eq!(ops(&tokens), vec!["0", "5274f5b99c72561a3da2adf720dc8e2cd6eee497"]);
    }
}
