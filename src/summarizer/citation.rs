use crate::domain::Post;

/// Map 1-based reference indices from a provider response back to post ids.
///
/// Pure: preserves the provider's order, keeps duplicates, and silently
/// drops anything outside `[1, enumerated.len()]` so a reference can never
/// dangle.
pub fn resolve(refs: &[i64], enumerated: &[&Post]) -> Vec<String> {
    refs.iter()
        .filter_map(|&idx| {
            if idx < 1 {
                return None;
            }
            enumerated.get(idx as usize - 1).map(|p| p.id.clone())
        })
        .collect()
}
