//! Reviewer selection
//!
//! Picks are uniform over an explicit candidate list, drawn from whatever
//! random source the caller passes in.

use rand::seq::SliceRandom;
use rand::Rng;

/// Drop every candidate that appears in `excluded`
pub fn eligible(candidates: Vec<String>, excluded: &[&str]) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|c| !excluded.contains(&c.as_str()))
        .collect()
}

/// Up to `count` distinct candidates, sampled without replacement
///
/// The result is sorted so it can be stored and compared directly.
pub fn pick_reviewers<R>(candidates: &[String], count: usize, rng: &mut R) -> Vec<String>
where
    R: Rng + ?Sized,
{
    let mut picked: Vec<String> = candidates.choose_multiple(rng, count).cloned().collect();
    picked.sort();
    picked
}

/// One candidate chosen uniformly at random, if there is any
pub fn pick_one<R>(candidates: &[String], rng: &mut R) -> Option<String>
where
    R: Rng + ?Sized,
{
    candidates.choose(rng).cloned()
}
