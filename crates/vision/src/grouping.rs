use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    fn similar(&self, other: &Rect, eps: f64) -> bool {
        let delta = eps
            * (self.width.min(other.width) + self.height.min(other.height)) as f64
            * 0.5;
        ((self.x - other.x).abs() as f64) <= delta
            && ((self.y - other.y).abs() as f64) <= delta
            && ((self.x + self.width - other.x - other.width).abs() as f64) <= delta
            && ((self.y + self.height - other.y - other.height).abs() as f64) <= delta
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

// class ids follow the order of each class's first member
fn partition(rects: &[Rect], eps: f64) -> (Vec<usize>, usize) {
    let mut parent: Vec<usize> = (0..rects.len()).collect();
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].similar(&rects[j], eps) {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut class_of_root = vec![usize::MAX; rects.len()];
    let mut labels = Vec::with_capacity(rects.len());
    let mut classes = 0;
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        if class_of_root[root] == usize::MAX {
            class_of_root[root] = classes;
            classes += 1;
        }
        labels.push(class_of_root[root]);
    }
    (labels, classes)
}

/// Merges overlapping raw detections the way OpenCV's `groupRectangles` does.
///
/// Clusters with `min_neighbors` members or fewer are dropped, as are
/// clusters lying inside a stronger one. `min_neighbors == 0` returns the
/// input unchanged.
pub fn group_rectangles(rects: &[Rect], min_neighbors: u32, eps: f64) -> Vec<Rect> {
    if min_neighbors == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let (labels, classes) = partition(rects, eps);
    let mut sums = vec![[0i64; 4]; classes];
    let mut counts = vec![0u32; classes];
    for (rect, &label) in rects.iter().zip(&labels) {
        let s = &mut sums[label];
        s[0] += rect.x as i64;
        s[1] += rect.y as i64;
        s[2] += rect.width as i64;
        s[3] += rect.height as i64;
        counts[label] += 1;
    }
    let averaged: Vec<Rect> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let inv = 1.0 / n as f64;
            Rect::new(
                (s[0] as f64 * inv).round() as i32,
                (s[1] as f64 * inv).round() as i32,
                (s[2] as f64 * inv).round() as i32,
                (s[3] as f64 * inv).round() as i32,
            )
        })
        .collect();

    let mut grouped = Vec::new();
    for i in 0..classes {
        let (r1, n1) = (averaged[i], counts[i]);
        if n1 <= min_neighbors {
            continue;
        }
        let nested = (0..classes).any(|j| {
            let (r2, n2) = (averaged[j], counts[j]);
            if j == i || n2 <= min_neighbors {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.x + r1.width <= r2.x + r2.width + dx
                && r1.y + r1.height <= r2.y + r2.height + dy
                && (n2 > n1.max(3) || n1 < 3)
        });
        if !nested {
            grouped.push(r1);
        }
    }
    grouped
}
