// src/utils/html.rs

/// Sanitizes admin-authored text (test names, prompts, choice labels) with
/// ammonia's whitelist before it is stored and later rendered by clients.
///
/// Dangerous tags are removed together with their content (`<script>`,
/// `<style>`); harmless formatting such as `<b>` survives.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input.trim())
}
