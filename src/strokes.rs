// ===========================================================================
// Stroke Construction (street continuity)
// ===========================================================================
//
// When several incoming edges converge on the same connector, only one of
// them is the street that actually continues into the roundabout; the rest
// are side arms. Strokes settle the question: split every line into atomic
// segments, then chain segments across shared endpoints whenever the
// deflection angle stays within the configured tolerance. The chain
// containing the connector names the continuing street.
//
// Node identity uses a quantized coordinate key rather than exact float
// equality, so two endpoints a rounding error apart still meet at one node.
// At each node, candidate pairings are ranked by deflection and linked
// greedily, mutually-best first; every segment end joins at most one other
// segment, which keeps strokes simple paths.
// ===========================================================================

use ahash::AHashMap;
use geo::{Coord, LineString};

/// Tolerance added to the deflection threshold so exact-colinearity checks
/// survive floating-point noise.
const ANGLE_EPS_DEG: f64 = 1e-6;

/// Quantize a coordinate onto the snap grid.
pub(crate) fn quantize(c: Coord<f64>, snap: f64) -> (i64, i64) {
    ((c.x / snap).round() as i64, (c.y / snap).round() as i64)
}

/// Atomic segment: which input line it came from, plus its two endpoints.
#[derive(Clone, Copy, Debug)]
struct Segment {
    line: usize,
    a: Coord<f64>,
    b: Coord<f64>,
}

impl Segment {
    /// (endpoint at `end`, the opposite endpoint)
    fn oriented(&self, end: usize) -> (Coord<f64>, Coord<f64>) {
        if end == 0 { (self.a, self.b) } else { (self.b, self.a) }
    }
}

/// Deflection in degrees when travelling through a shared node from segment
/// `s1` (arriving at its `end1` endpoint) into segment `s2` (leaving from its
/// `end2` endpoint). 0 means dead straight.
fn deflection_deg(s1: &Segment, end1: usize, s2: &Segment, end2: usize) -> f64 {
    let (node1, other1) = s1.oriented(end1);
    let (node2, other2) = s2.oriented(end2);
    let u = (node1.x - other1.x, node1.y - other1.y);
    let v = (other2.x - node2.x, other2.y - node2.y);
    let nu = u.0.hypot(u.1);
    let nv = v.0.hypot(v.1);
    if nu == 0.0 || nv == 0.0 {
        return 180.0;
    }
    let cos = ((u.0 * v.0 + u.1 * v.1) / (nu * nv)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// Strokes over a set of input lines: a partition of their atomic segments
/// into maximal low-deflection chains.
pub(crate) struct StrokeSet {
    seg_stroke: Vec<usize>,
    line_segments: Vec<Vec<usize>>,
}

impl StrokeSet {
    /// Stroke id covering the whole line, if all of its segments ended up in
    /// the same chain. A line split across strokes has no single id.
    pub fn line_stroke(&self, line: usize) -> Option<usize> {
        let segments = &self.line_segments[line];
        let first = *segments.first()?;
        let id = self.seg_stroke[first];
        segments
            .iter()
            .all(|&s| self.seg_stroke[s] == id)
            .then_some(id)
    }
}

pub(crate) fn build_strokes(
    lines: &[LineString<f64>],
    angle_threshold_deg: f64,
    snap: f64,
) -> StrokeSet {
    let mut segments: Vec<Segment> = Vec::new();
    let mut line_segments = vec![Vec::new(); lines.len()];
    for (line, ls) in lines.iter().enumerate() {
        for w in ls.0.windows(2) {
            if quantize(w[0], snap) == quantize(w[1], snap) {
                continue;
            }
            line_segments[line].push(segments.len());
            segments.push(Segment {
                line,
                a: w[0],
                b: w[1],
            });
        }
    }

    // Stub lists per quantized node: (segment, which endpoint sits here).
    let mut nodes: AHashMap<(i64, i64), Vec<(usize, usize)>> = AHashMap::new();
    for (si, seg) in segments.iter().enumerate() {
        nodes.entry(quantize(seg.a, snap)).or_default().push((si, 0));
        nodes.entry(quantize(seg.b, snap)).or_default().push((si, 1));
    }

    // Greedy mutually-best pairing per node, ranked by deflection. Node order
    // is sorted so results never depend on hash iteration.
    let mut links: Vec<[Option<usize>; 2]> = vec![[None, None]; segments.len()];
    let mut keys: Vec<(i64, i64)> = nodes.keys().copied().collect();
    keys.sort_unstable();
    for key in keys {
        let stubs = &nodes[&key];
        if stubs.len() < 2 {
            continue;
        }
        let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
        for i in 0..stubs.len() {
            for j in (i + 1)..stubs.len() {
                let (si, ei) = stubs[i];
                let (sj, ej) = stubs[j];
                if si == sj {
                    continue;
                }
                let d = deflection_deg(&segments[si], ei, &segments[sj], ej);
                if d <= angle_threshold_deg + ANGLE_EPS_DEG {
                    pairs.push((d, i, j));
                }
            }
        }
        pairs.sort_by(|x, y| x.0.total_cmp(&y.0).then(x.1.cmp(&y.1)).then(x.2.cmp(&y.2)));
        let mut used = vec![false; stubs.len()];
        for (_, i, j) in pairs {
            if used[i] || used[j] {
                continue;
            }
            used[i] = true;
            used[j] = true;
            let (si, ei) = stubs[i];
            let (sj, ej) = stubs[j];
            links[si][ei] = Some(sj);
            links[sj][ej] = Some(si);
        }
    }

    // Strokes are the connected components of the link graph.
    let mut seg_stroke = vec![usize::MAX; segments.len()];
    let mut next_stroke = 0;
    for start in 0..segments.len() {
        if seg_stroke[start] != usize::MAX {
            continue;
        }
        seg_stroke[start] = next_stroke;
        let mut stack = vec![start];
        while let Some(cur) = stack.pop() {
            for &linked in links[cur].iter().flatten() {
                if seg_stroke[linked] == usize::MAX {
                    seg_stroke[linked] = next_stroke;
                    stack.push(linked);
                }
            }
        }
        next_stroke += 1;
    }

    StrokeSet {
        seg_stroke,
        line_segments,
    }
}
