//! Boosted Haar cascades in the OpenCV storage format.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::integral::IntegralImage;
use crate::xml::{parse_document, XmlNode};
use crate::VisionError;

#[derive(Debug, Clone, Copy, PartialEq)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TreeNode {
    /// Child index when positive, negated leaf index otherwise.
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct WeakTree {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
struct Stage {
    threshold: f64,
    trees: Vec<WeakTree>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HaarCascade {
    width: u32,
    height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VisionError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        let cascade = Self::from_xml(&source)?;
        info!(
            path = ?path,
            stages = cascade.stages.len(),
            features = cascade.features.len(),
            "loaded haar cascade"
        );
        Ok(cascade)
    }

    pub fn from_xml(source: &str) -> Result<Self, VisionError> {
        let document = parse_document(source)?;
        let storage = document.require("opencv_storage")?;
        let node = storage
            .children
            .first()
            .ok_or_else(|| VisionError::cascade("opencv_storage is empty"))?;
        if node.child("size").is_some() && node.child("stageType").is_none() {
            return Err(VisionError::cascade(
                "legacy haar classifier format is not supported",
            ));
        }
        if let Some(kind) = node.child("stageType") {
            if kind.text() != "BOOST" {
                return Err(VisionError::cascade(format!(
                    "unsupported stage type {}",
                    kind.text()
                )));
            }
        }
        if let Some(kind) = node.child("featureType") {
            if kind.text() != "HAAR" {
                return Err(VisionError::cascade(format!(
                    "unsupported feature type {}",
                    kind.text()
                )));
            }
        }

        let width: u32 = parse_scalar(node.require("width")?)?;
        let height: u32 = parse_scalar(node.require("height")?)?;
        if width < 3 || height < 3 {
            return Err(VisionError::cascade("detection window must be at least 3x3"));
        }

        let features = node
            .require("features")?
            .children
            .iter()
            .map(|feature| parse_feature(feature, width, height))
            .collect::<Result<Vec<_>, _>>()?;
        let stages = node
            .require("stages")?
            .children
            .iter()
            .map(|stage| parse_stage(stage, features.len()))
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Err(VisionError::cascade("cascade has no stages"));
        }

        Ok(Self {
            width,
            height,
            stages,
            features,
        })
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs the cascade on the window whose top-left corner is `(x, y)`.
    ///
    /// Returns 1 when every stage accepts, otherwise the negated index of the
    /// rejecting stage (so 0 means the first stage rejected). Windows whose
    /// inner standard deviation is 10 or less return -1 without running any
    /// stage.
    pub fn evaluate(&self, integral: &IntegralImage, x: u32, y: u32) -> i32 {
        let (nw, nh) = (self.width - 2, self.height - 2);
        let area = (nw * nh) as f64;
        let sum = integral.rect_sum(x + 1, y + 1, nw, nh);
        let sqsum = integral.rect_sqsum(x + 1, y + 1, nw, nh);
        let variance = area * sqsum - sum * sum;
        if variance <= 0.0 {
            return -1;
        }
        let norm = variance.sqrt();
        if area / norm >= 0.1 {
            return -1;
        }
        let inv_norm = 1.0 / norm;

        for (index, stage) in self.stages.iter().enumerate() {
            let mut score = 0.0;
            for tree in &stage.trees {
                let mut idx = 0i32;
                loop {
                    let node = tree.nodes[idx as usize];
                    let value = self.feature_value(node.feature, integral, x, y) * inv_norm;
                    idx = if value < node.threshold {
                        node.left
                    } else {
                        node.right
                    };
                    if idx <= 0 {
                        break;
                    }
                }
                score += tree.leaves[(-idx) as usize];
            }
            if score < stage.threshold {
                return -(index as i32);
            }
        }
        1
    }

    fn feature_value(&self, feature: usize, integral: &IntegralImage, x: u32, y: u32) -> f64 {
        self.features[feature]
            .rects
            .iter()
            .map(|r| r.weight * integral.rect_sum(x + r.x, y + r.y, r.width, r.height))
            .sum()
    }
}

fn parse_scalar<T: std::str::FromStr>(node: &XmlNode) -> Result<T, VisionError> {
    node.text().parse().map_err(|_| {
        VisionError::cascade(format!("<{}> is not a number: {}", node.name, node.text()))
    })
}

fn parse_list(node: &XmlNode) -> Result<Vec<f64>, VisionError> {
    node.text()
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                VisionError::cascade(format!("<{}> has a bad number: {token}", node.name))
            })
        })
        .collect()
}

fn parse_feature(node: &XmlNode, width: u32, height: u32) -> Result<HaarFeature, VisionError> {
    if let Some(tilted) = node.child("tilted") {
        if tilted.text() != "0" {
            return Err(VisionError::cascade("tilted haar features are not supported"));
        }
    }
    let rects = node
        .require("rects")?
        .children
        .iter()
        .map(|rect| {
            let values = parse_list(rect)?;
            if values.len() != 5 {
                return Err(VisionError::cascade(format!(
                    "feature rect needs 5 values, got {}",
                    values.len()
                )));
            }
            if values[..4].iter().any(|v| *v < 0.0 || v.fract() != 0.0) {
                return Err(VisionError::cascade("feature rect has a bad coordinate"));
            }
            let r = WeightedRect {
                x: values[0] as u32,
                y: values[1] as u32,
                width: values[2] as u32,
                height: values[3] as u32,
                weight: values[4],
            };
            if r.x + r.width > width || r.y + r.height > height {
                return Err(VisionError::cascade("feature rect exceeds the window"));
            }
            Ok(r)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if rects.is_empty() {
        return Err(VisionError::cascade("feature without rects"));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: &XmlNode, feature_count: usize) -> Result<Stage, VisionError> {
    let threshold = parse_scalar(node.require("stageThreshold")?)?;
    let trees = node
        .require("weakClassifiers")?
        .children
        .iter()
        .map(|weak| parse_tree(weak, feature_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage { threshold, trees })
}

fn parse_tree(node: &XmlNode, feature_count: usize) -> Result<WeakTree, VisionError> {
    let raw_nodes = parse_list(node.require("internalNodes")?)?;
    let leaves = parse_list(node.require("leafValues")?)?;
    if raw_nodes.is_empty() || raw_nodes.len() % 4 != 0 {
        return Err(VisionError::cascade(
            "internalNodes must hold groups of four values",
        ));
    }
    if raw_nodes
        .chunks_exact(4)
        .any(|quad| quad[2] < 0.0 || quad[2].fract() != 0.0)
    {
        return Err(VisionError::cascade("feature index must be a non-negative integer"));
    }
    let nodes: Vec<TreeNode> = raw_nodes
        .chunks_exact(4)
        .map(|quad| TreeNode {
            left: quad[0] as i32,
            right: quad[1] as i32,
            feature: quad[2] as usize,
            threshold: quad[3],
        })
        .collect();
    for n in &nodes {
        if n.feature >= feature_count {
            return Err(VisionError::cascade(format!(
                "feature index {} out of range",
                n.feature
            )));
        }
        for child in [n.left, n.right] {
            let in_range = if child > 0 {
                (child as usize) < nodes.len()
            } else {
                ((-child) as usize) < leaves.len()
            };
            if !in_range {
                return Err(VisionError::cascade(format!("tree link {child} out of range")));
            }
        }
    }
    Ok(WeakTree { nodes, leaves })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    /// 4x4 window, one stump on a left-dark/right-bright edge feature.
    pub(crate) const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>4</height>
  <width>4</width>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>0 -1 0 1.</internalNodes>
          <leafValues>-1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>0 0 2 4 -1.</_>
        <_>2 0 2 4 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    #[test]
    fn parses_fixture() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        assert_eq!(cascade.window_size(), (4, 4));
        assert_eq!(cascade.stage_count(), 1);
    }

    #[test]
    fn accepts_edges_and_rejects_flat_windows() {
        let cascade = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let edge = GrayImage::from_fn(4, 4, |x, _| Luma([if x < 2 { 0 } else { 255 }]));
        assert_eq!(cascade.evaluate(&IntegralImage::new(&edge), 0, 0), 1);

        let flat = GrayImage::new(4, 4);
        assert_eq!(cascade.evaluate(&IntegralImage::new(&flat), 0, 0), -1);
    }

    #[test]
    fn low_contrast_windows_skip_every_stage() {
        // accepts any window whose feature value is at least -1
        let xml = EDGE_CASCADE.replace("0 -1 0 1.", "0 -1 0 -1.");
        let cascade = HaarCascade::from_xml(&xml).unwrap();
        let checker = |low: u8, high: u8| {
            GrayImage::from_fn(4, 4, move |x, y| Luma([if (x + y) % 2 == 0 { low } else { high }]))
        };
        let faint = checker(100, 102);
        assert_eq!(cascade.evaluate(&IntegralImage::new(&faint), 0, 0), -1);

        let contrasted = checker(60, 140);
        assert_eq!(cascade.evaluate(&IntegralImage::new(&contrasted), 0, 0), 1);
    }

    #[test]
    fn rejects_negative_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 1.", "0 -1 -1 1.");
        assert!(HaarCascade::from_xml(&xml).is_err());
    }

    #[test]
    fn rejects_tilted_features() {
        let xml = EDGE_CASCADE.replace("<rects>", "<tilted>1</tilted><rects>");
        assert!(HaarCascade::from_xml(&xml).is_err());
    }

    #[test]
    fn rejects_out_of_range_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 1.", "0 -1 3 1.");
        assert!(HaarCascade::from_xml(&xml).is_err());
    }

    #[test]
    fn rejects_legacy_format() {
        let xml = concat!(
            r#"<opencv_storage><old type_id="opencv-haar-classifier">"#,
            "<size>24 24</size><stages></stages></old></opencv_storage>",
        );
        assert!(HaarCascade::from_xml(xml).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            HaarCascade::load("no/such/cascade.xml"),
            Err(VisionError::Io(_))
        ));
    }
}
