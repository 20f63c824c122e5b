//! Extension hooks run over a flattened document.
//!
//! A hook pairs a selector with a mutator. Every outermost match is copied
//! into its own DOM, the mutators run on a bounded rayon pool, and the
//! results replace the original elements once all of them have finished.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::dom::{ArenaDom, ArenaNodeId, Query};
use crate::error::{BoxError, Error, Result};

/// Mutator signature: the detached copy, its root element and the ids of
/// every page in the book.
pub type HookFn = dyn Fn(&mut ArenaDom, ArenaNodeId, &HashSet<String>) -> std::result::Result<(), BoxError>
    + Send
    + Sync;

/// A selector and the mutator applied to each element it matches.
#[derive(Clone)]
pub struct Hook {
    query: Query,
    mutator: Arc<HookFn>,
}

impl Hook {
    pub fn new<F>(selector: &str, mutator: F) -> Result<Self>
    where
        F: Fn(&mut ArenaDom, ArenaNodeId, &HashSet<String>) -> std::result::Result<(), BoxError>
            + Send
            + Sync
            + 'static,
    {
        Ok(Self {
            query: Query::parse(selector)?,
            mutator: Arc::new(mutator),
        })
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").field("query", &self.query).finish()
    }
}

/// Run `hooks` in order over the subtree under `root`.
pub(crate) fn run_hooks(
    dom: &mut ArenaDom,
    root: ArenaNodeId,
    hooks: &[Hook],
    page_ids: &HashSet<String>,
    workers: usize,
) -> Result<()> {
    if hooks.is_empty() {
        return Ok(());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| Error::WorkerPool(format!("failed to create hook pool: {e}")))?;

    for hook in hooks {
        let matches = hook.query.select_outermost(dom, root);
        tracing::debug!(query = %hook.query.as_str(), matches = matches.len(), "running hook");
        if matches.is_empty() {
            continue;
        }

        let copies: Vec<(ArenaNodeId, ArenaDom, ArenaNodeId)> = matches
            .iter()
            .map(|&target| {
                let mut copy = ArenaDom::new();
                let copy_root = copy.import(dom, target);
                let document = copy.document();
                copy.append(document, copy_root);
                (target, copy, copy_root)
            })
            .collect();

        let mutator = &hook.mutator;
        let query = hook.query.as_str();
        let results: Vec<(ArenaNodeId, ArenaDom)> = pool.install(|| {
            copies
                .into_par_iter()
                .map(|(target, mut copy, copy_root)| {
                    mutator(&mut copy, copy_root, page_ids).map_err(|source| Error::Hook {
                        query: query.to_string(),
                        source,
                    })?;
                    Ok((target, copy))
                })
                .collect::<Result<Vec<_>>>()
        })?;

        for (target, copy) in results {
            graft(dom, target, &copy);
        }
    }
    Ok(())
}

/// Replace `target` with whatever the copy's document now holds.
fn graft(dom: &mut ArenaDom, target: ArenaNodeId, copy: &ArenaDom) {
    for child in copy.children(copy.document()) {
        let imported = dom.import(copy, child);
        dom.insert_before(target, imported);
    }
    dom.detach(target);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_html};

    #[test]
    fn test_hooks_replace_matches() {
        let mut dom = parse_html(
            r#"<div><a class="x" href="/ex/1">one</a><p><a class="x" href="/ex/2">two</a></p></div>"#,
        );
        let body = dom.body().unwrap();
        let hook = Hook::new("a.x", |dom, root, _pages| {
            let href = dom.get_attr(root, "href").unwrap_or_default().to_string();
            let replacement = dom.create_html_element("div", &[("class", "exercise")]);
            dom.append_text(replacement, &href);
            dom.insert_before(root, replacement);
            dom.detach(root);
            Ok(())
        })
        .unwrap();

        run_hooks(&mut dom, body, &[hook], &HashSet::new(), 2).unwrap();
        assert_eq!(
            inner_html(&dom, body),
            r#"<div><div class="exercise">/ex/1</div><p><div class="exercise">/ex/2</div></p></div>"#
        );
    }

    #[test]
    fn test_hooks_see_page_ids() {
        let mut dom = parse_html(r#"<p class="t">x</p>"#);
        let body = dom.body().unwrap();
        let pages: HashSet<String> = ["e78d4f90".to_string()].into();
        let hook = Hook::new("p.t", |dom, root, pages| {
            let count = pages.len().to_string();
            dom.set_attr(root, "data-pages", count);
            Ok(())
        })
        .unwrap();
        run_hooks(&mut dom, body, &[hook], &pages, 1).unwrap();
        assert_eq!(inner_html(&dom, body), r#"<p class="t" data-pages="1">x</p>"#);
    }

    #[test]
    fn test_hook_failure_aborts() {
        let mut dom = parse_html("<p>x</p>");
        let body = dom.body().unwrap();
        let hook = Hook::new("p", |_, _, _| Err("boom".into())).unwrap();
        let err = run_hooks(&mut dom, body, &[hook], &HashSet::new(), 1).unwrap_err();
        assert!(matches!(err, Error::Hook { query, .. } if query == "p"));
    }

    #[test]
    fn test_invalid_selector() {
        assert!(matches!(Hook::new("p[", |_, _, _| Ok(())), Err(Error::InvalidQuery { .. })));
    }
}
