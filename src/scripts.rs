//! In-page JavaScript builders.
//!
//! Locator strategies are materialized as self-contained scripts executed
//! through [`BrowserAgent::run_script`](crate::agent::BrowserAgent). Field
//! scripts perform the mutation and return the resulting text so the caller
//! can route it through the verification oracle; button scripts apply the
//! shared disambiguation rules (keyword disqualifiers, structural scope,
//! enabled + rendered) and return a boolean.

/// Serialize a string into a JS literal. Serializing a `&str` cannot fail;
/// the empty-literal fallback keeps the builders infallible.
fn js_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn js_str_array(values: &[&str]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

/// Shared helper predicate: a candidate must be enabled and visually
/// rendered (non-zero layout box, not display:none) to be actionable.
const ACTIONABLE_HELPER: &str = "\
const actionable = (el) => {\n\
    if (!el || el.disabled || el.getAttribute('aria-disabled') === 'true') return false;\n\
    const rect = el.getBoundingClientRect();\n\
    if (rect.width === 0 || rect.height === 0) return false;\n\
    const style = window.getComputedStyle(el);\n\
    return style.display !== 'none' && style.visibility !== 'hidden';\n\
};";

/// Fill the element matched by a structural selector and return its text.
pub fn fill_by_selector(selector: &str, value: &str) -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const el = document.querySelector({selector});\n\
            if (!el || !actionable(el)) {{\n\
                return null;\n\
            }}\n\
            el.focus();\n\
            if (el.isContentEditable) {{\n\
                el.innerText = {value};\n\
            }} else if ('value' in el) {{\n\
                el.value = {value};\n\
            }} else {{\n\
                el.textContent = {value};\n\
            }}\n\
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n\
            return el.isContentEditable ? el.innerText : (el.value ?? el.textContent);\n\
        }})()",
        helper = ACTIONABLE_HELPER,
        selector = js_str(selector),
        value = js_str(value),
    )
}

/// Heuristic field scan: score editable candidates by hint keywords found in
/// placeholder/aria-label/data-testid, fill the best match, return its text.
pub fn fill_by_hint(hints: &[&str], value: &str) -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const hints = {hints};\n\
            const candidates = Array.from(document.querySelectorAll(\n\
                'input, textarea, [contenteditable=\"true\"], [role=\"textbox\"]'));\n\
            const hintText = (el) => [\n\
                el.getAttribute('placeholder'),\n\
                el.getAttribute('aria-label'),\n\
                el.getAttribute('data-testid'),\n\
                el.getAttribute('name'),\n\
            ].filter(Boolean).join(' ').toLowerCase();\n\
            let best = null, bestScore = 0;\n\
            for (const el of candidates) {{\n\
                if (!actionable(el)) continue;\n\
                const text = hintText(el);\n\
                const score = hints.reduce((acc, hint) => acc + (text.includes(hint) ? 1 : 0), 0);\n\
                if (score > bestScore) {{ best = el; bestScore = score; }}\n\
            }}\n\
            if (!best) return null;\n\
            best.focus();\n\
            if (best.isContentEditable) {{ best.innerText = {value}; }}\n\
            else if ('value' in best) {{ best.value = {value}; }}\n\
            else {{ best.textContent = {value}; }}\n\
            best.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
            best.dispatchEvent(new Event('change', {{ bubbles: true }}));\n\
            return best.isContentEditable ? best.innerText : (best.value ?? best.textContent);\n\
        }})()",
        helper = ACTIONABLE_HELPER,
        hints = js_str_array(hints),
        value = js_str(value),
    )
}

/// Last-resort broad scan: fill the nth visible editable region on the page
/// (rank 0 is typically the title surface, rank 1 the body).
pub fn fill_by_rank(rank: usize, value: &str) -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const candidates = Array.from(document.querySelectorAll(\n\
                'input, textarea, [contenteditable=\"true\"], [role=\"textbox\"]'))\n\
                .filter(actionable);\n\
            const el = candidates[{rank}];\n\
            if (!el) return null;\n\
            el.focus();\n\
            if (el.isContentEditable) {{ el.innerText = {value}; }}\n\
            else if ('value' in el) {{ el.value = {value}; }}\n\
            else {{ el.textContent = {value}; }}\n\
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
            el.dispatchEvent(new Event('change', {{ bubbles: true }}));\n\
            return el.isContentEditable ? el.innerText : (el.value ?? el.textContent);\n\
        }})()",
        helper = ACTIONABLE_HELPER,
        rank = rank,
        value = js_str(value),
    )
}

/// Read back the editable surfaces for the content verification pass.
/// Returns `{ title, body }` from the first two visible editable regions.
pub fn read_content() -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const candidates = Array.from(document.querySelectorAll(\n\
                'input, textarea, [contenteditable=\"true\"], [role=\"textbox\"]'))\n\
                .filter(actionable);\n\
            const text = (el) => el ? (el.isContentEditable ? el.innerText : (el.value ?? el.textContent ?? '')) : '';\n\
            return {{ title: text(candidates[0]), body: text(candidates[1]) }};\n\
        }})()",
        helper = ACTIONABLE_HELPER,
    )
}

/// Whether any of the given editor-surface selectors currently matches an
/// actionable element.
pub fn editor_present(selectors: &[&str]) -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const selectors = {selectors};\n\
            return selectors.some((sel) => {{\n\
                const el = document.querySelector(sel);\n\
                return el !== null && actionable(el);\n\
            }});\n\
        }})()",
        helper = ACTIONABLE_HELPER,
        selectors = js_str_array(selectors),
    )
}

/// Core button matcher shared by the click and readiness builders.
///
/// Disambiguation rules, in order: the visible text must contain one of
/// `keywords`; candidates whose text contains any `disqualifiers` entry are
/// excluded (a schedule/draft control must never win a publish-now goal);
/// the candidate must live inside `scope_selector`; and it must be
/// actionable per [`ACTIONABLE_HELPER`].
fn button_matcher(keywords: &[&str], disqualifiers: &[&str], scope_selector: &str) -> String {
    format!(
        "{helper}\n\
        const keywords = {keywords};\n\
        const disqualifiers = {disqualifiers};\n\
        const scope = document.querySelector({scope});\n\
        const findButton = () => {{\n\
            if (!scope) return null;\n\
            const candidates = Array.from(scope.querySelectorAll('button, [role=\"button\"], a'));\n\
            for (const el of candidates) {{\n\
                const text = (el.innerText || el.textContent || '').trim().toLowerCase();\n\
                if (!text) continue;\n\
                if (!keywords.some((kw) => text.includes(kw))) continue;\n\
                if (disqualifiers.some((kw) => text.includes(kw))) continue;\n\
                if (!actionable(el)) continue;\n\
                return el;\n\
            }}\n\
            return null;\n\
        }};",
        helper = ACTIONABLE_HELPER,
        keywords = js_str_array(keywords),
        disqualifiers = js_str_array(disqualifiers),
        scope = js_str(scope_selector),
    )
}

/// Click the first button matching the disambiguation rules; returns true on
/// a click, false when no candidate qualifies.
pub fn click_button(keywords: &[&str], disqualifiers: &[&str], scope_selector: &str) -> String {
    format!(
        "(function() {{\n\
            {matcher}\n\
            const el = findButton();\n\
            if (!el) return false;\n\
            el.click();\n\
            return true;\n\
        }})()",
        matcher = button_matcher(keywords, disqualifiers, scope_selector),
    )
}

/// Whether a qualifying button is present and enabled without clicking it.
pub fn button_ready(keywords: &[&str], disqualifiers: &[&str], scope_selector: &str) -> String {
    format!(
        "(function() {{\n\
            {matcher}\n\
            return findButton() !== null;\n\
        }})()",
        matcher = button_matcher(keywords, disqualifiers, scope_selector),
    )
}

/// Type one tag into a token-input field and commit it with Enter.
pub fn add_tag(selector: &str, tag: &str) -> String {
    format!(
        "(function() {{\n\
            {helper}\n\
            const el = document.querySelector({selector});\n\
            if (!el || !actionable(el)) return false;\n\
            el.focus();\n\
            if ('value' in el) {{ el.value = {tag}; }} else {{ el.textContent = {tag}; }}\n\
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
            const key = {{ key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }};\n\
            el.dispatchEvent(new KeyboardEvent('keydown', key));\n\
            el.dispatchEvent(new KeyboardEvent('keyup', key));\n\
            return true;\n\
        }})()",
        helper = ACTIONABLE_HELPER,
        selector = js_str(selector),
        tag = js_str(tag),
    )
}

/// Append an attached media element to the editor body surface.
pub fn attach_media(media_url: &str, body_selector: &str) -> String {
    format!(
        "(function() {{\n\
            const surface = document.querySelector({selector});\n\
            if (!surface) return false;\n\
            const img = document.createElement('img');\n\
            img.src = {url};\n\
            surface.appendChild(img);\n\
            surface.dispatchEvent(new Event('input', {{ bubbles: true }}));\n\
            return true;\n\
        }})()",
        selector = js_str(body_selector),
        url = js_str(media_url),
    )
}

/// Scrape the authenticated user's display name or handle, or null.
pub fn user_handle(selectors: &[&str]) -> String {
    format!(
        "(function() {{\n\
            const selectors = {selectors};\n\
            for (const sel of selectors) {{\n\
                const el = document.querySelector(sel);\n\
                const text = el ? (el.innerText || el.textContent || '').trim() : '';\n\
                if (text) return text;\n\
            }}\n\
            return null;\n\
        }})()",
        selectors = js_str_array(selectors),
    )
}

/// Scrape engagement counters from a published post.
/// Returns `{ views, reactions, comments }`, each a number or null.
pub fn engagement_metrics() -> String {
    "(function() {\n\
        const parseCount = (text) => {\n\
            if (!text) return null;\n\
            const cleaned = String(text).trim().toLowerCase().replace(/,/g, '');\n\
            const match = cleaned.match(/([0-9]*\\.?[0-9]+)\\s*(k|m)?/);\n\
            if (!match) return null;\n\
            let value = parseFloat(match[1]);\n\
            if (match[2] === 'k') value *= 1000;\n\
            if (match[2] === 'm') value *= 1000000;\n\
            return Math.round(value);\n\
        };\n\
        const firstText = (selectors) => {\n\
            for (const sel of selectors) {\n\
                const el = document.querySelector(sel);\n\
                if (el) return el.innerText || el.textContent;\n\
            }\n\
            return null;\n\
        };\n\
        return {\n\
            views: parseCount(firstText(['[data-testid=\"views\"]', '.views-count'])),\n\
            reactions: parseCount(firstText(['[data-testid=\"claps\"]', '[data-testid=\"likes\"]', '.reaction-count'])),\n\
            comments: parseCount(firstText(['[data-testid=\"responses\"]', '[data-testid=\"comments\"]', '.comments-count'])),\n\
        };\n\
    })()"
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_embedded_as_json_literals() {
        let script = fill_by_selector("h1[data-testid='title']", "He said \"go\"");
        assert!(script.contains("\"h1[data-testid='title']\""));
        assert!(script.contains("He said \\\"go\\\""));
    }

    #[test]
    fn button_scripts_carry_disambiguation_inputs() {
        let script = click_button(&["publish"], &["schedule", "draft"], "header");
        assert!(script.contains("\"publish\""));
        assert!(script.contains("\"schedule\""));
        assert!(script.contains("\"draft\""));
        assert!(script.contains("\"header\""));
        assert!(script.contains("getBoundingClientRect"));
    }

    #[test]
    fn readiness_script_never_clicks() {
        let script = button_ready(&["publish"], &[], "header");
        assert!(!script.contains(".click()"));
    }

    #[test]
    fn rank_fill_indexes_visible_candidates() {
        let script = fill_by_rank(1, "body text");
        assert!(script.contains("candidates[1]"));
    }
}
