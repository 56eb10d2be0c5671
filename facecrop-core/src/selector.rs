use crate::postprocess::FaceCandidate;

/// Pick the candidate with the largest box area.
///
/// Only a strictly larger area displaces the current pick, so the earliest
/// of several equal candidates wins. Returns `None` for an empty slice.
pub fn select_best(candidates: &[FaceCandidate]) -> Option<&FaceCandidate> {
    let (first, rest) = candidates.split_first()?;
    let mut best = first;
    let mut best_area = first.bbox.area();
    for candidate in rest {
        let area = candidate.bbox.area();
        if area > best_area {
            best = candidate;
            best_area = area;
        }
    }
    Some(best)
}
