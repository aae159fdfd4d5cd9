//! The extraction algorithm shipped to the page for execution.
//!
//! Per the cross-context design note, this must be a self-contained pure
//! function of no arguments: no captured closures, only plain serialisable
//! data in its return value. It is handed to [`crate::browser_host::PageHandle::evaluate`]
//! verbatim; the Rust side never parses or transforms its body, only its
//! JSON result.

pub const EXTRACTION_SCRIPT: &str = r#"
(() => {
  const INTERACTIVE_TAGS = new Set(['a','button','input','textarea','select','option','details','summary']);
  const INTERACTIVE_ROLES = new Set([
    'button','link','tab','menuitem','menuitemcheckbox','menuitemradio','option','radio',
    'switch','textbox','combobox','searchbox','slider','spinbutton','checkbox','listbox',
    'treeitem','gridcell'
  ]);
  const CLICK_ATTRS = ['onclick', 'ng-click', '@click'];

  function isInteractive(el) {
    const tag = el.tagName.toLowerCase();
    if (INTERACTIVE_TAGS.has(tag)) return true;
    const role = el.getAttribute('role');
    if (role && INTERACTIVE_ROLES.has(role)) return true;
    const tabindex = el.getAttribute('tabindex');
    if (tabindex !== null && tabindex !== '-1') return true;
    if (el.getAttribute('contenteditable') === 'true') return true;
    if (CLICK_ATTRS.some((attr) => el.hasAttribute(attr))) return true;
    try {
      if (getComputedStyle(el).cursor === 'pointer') return true;
    } catch (_) { /* ignore */ }
    return false;
  }

  function isVisible(el) {
    try {
      const rect = el.getBoundingClientRect();
      if (rect.width === 0 && rect.height === 0) return false;
      const style = getComputedStyle(el);
      if (style.display === 'none' || style.visibility === 'hidden' || style.opacity === '0') {
        return false;
      }
      return true;
    } catch (_) {
      return true;
    }
  }

  function elementText(el) {
    const tag = el.tagName.toLowerCase();
    if (tag === 'input' || tag === 'textarea') {
      return el.value || el.getAttribute('placeholder') || el.getAttribute('aria-label') || el.getAttribute('name') || '';
    }
    if (tag === 'select') {
      const selected = el.options[el.selectedIndex];
      return selected ? selected.text : '';
    }
    if (tag === 'img') {
      return el.getAttribute('alt') || '';
    }
    let direct = '';
    for (const node of el.childNodes) {
      if (node.nodeType === Node.TEXT_NODE) direct += node.textContent;
    }
    direct = direct.trim();
    if (direct) return direct.slice(0, 200);
    return (el.innerText || '').trim().slice(0, 200);
  }

  function attrsFor(el, tag) {
    const out = {};
    const ariaLabel = el.getAttribute('aria-label');
    if (ariaLabel) out['aria-label'] = ariaLabel;
    const type = el.getAttribute('type');
    if (type) out.type = type;
    if (tag === 'a') {
      const href = el.getAttribute('href');
      if (href) out.href = href.slice(0, 80);
    }
    const role = el.getAttribute('role');
    if (role) out.role = role;
    const name = el.getAttribute('name');
    if (name) out.name = name;
    const placeholder = el.getAttribute('placeholder');
    if (placeholder) out.placeholder = placeholder;
    return out;
  }

  const all = Array.from(document.querySelectorAll('*'));
  const stats = { links: 0, interactive: 0, iframes: 0, images: 0, total_elements: all.length };
  for (const el of all) {
    const tag = el.tagName.toLowerCase();
    if (tag === 'a') stats.links += 1;
    if (tag === 'iframe') stats.iframes += 1;
    if (tag === 'img') stats.images += 1;
    if (isInteractive(el)) stats.interactive += 1;
  }

  const viewportHeight = window.innerHeight || document.documentElement.clientHeight || 1;
  const scrollY = window.scrollY || 0;
  const scrollHeight = document.documentElement.scrollHeight || viewportHeight;
  const pagesAbove = Math.round((scrollY / viewportHeight) * 10) / 10;
  const pagesBelowRaw = Math.max(0, scrollHeight - scrollY - viewportHeight) / viewportHeight;
  const pagesBelow = Math.round(pagesBelowRaw * 10) / 10;

  let index = 0;
  const lines = [];
  for (const el of all) {
    if (!isInteractive(el) || !isVisible(el)) continue;
    index += 1;
    el.setAttribute('data-ba-idx', String(index));
    const tag = el.tagName.toLowerCase();
    const attrs = attrsFor(el, tag);
    const attrString = Object.entries(attrs)
      .map(([k, v]) => `${k}='${v}'`)
      .join(' ');
    const text = elementText(el).slice(0, 150);
    lines.push(`[${index}]<${tag}${attrString ? ' ' + attrString : ''}>${text}</${tag}>`);
  }

  return {
    url: location.href,
    title: document.title,
    stats,
    scroll: {
      pages_above: pagesAbove,
      pages_below: pagesBelow,
      pixels_above: Math.round(scrollY),
      pixels_below: Math.round(Math.max(0, scrollHeight - scrollY - viewportHeight)),
    },
    elements_text: lines.join('\n'),
    element_count: index,
  };
})()
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_is_a_single_self_contained_expression() {
        let trimmed = EXTRACTION_SCRIPT.trim();
        assert!(trimmed.starts_with('('));
        assert!(trimmed.ends_with("})()"));
    }
}
