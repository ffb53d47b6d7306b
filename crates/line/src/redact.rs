/// Shorten a LINE user/group/room ID for logs: `U1234567890abcdef` → `U12...def`.
#[must_use]
pub fn mask_id(id: &str) -> String {
    mask(id, 3)
}

/// Reply tokens and access tokens keep only their first four characters.
#[must_use]
pub fn mask_token(token: &str) -> String {
    let head: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        return "****".into();
    }
    format!("{head}****")
}

fn mask(value: &str, keep: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= keep * 2 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}...{tail}")
}
