/// Returns a masked version of a secret for logs and display (first 6 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 12 {
        return "***".to_string();
    }
    let prefix: String = token.chars().take(6).collect();
    format!("{}...", prefix)
}
