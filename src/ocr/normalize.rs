//! Region normalizer
//!
//! The OCR service has shipped at least three response shapes over its
//! lifetime: objects carrying a four-point quadrilateral under
//! `text_region` or `bbox`, a legacy `[bbox, text, confidence]` array
//! triplet, and objects that already carry an axis-aligned rectangle.
//! This module classifies each raw item into one of those shapes and
//! converts it to a canonical [`OcrRegion`] exactly once.
//!
//! An item whose geometry is missing or malformed still becomes a
//! region, with a placeholder rectangle: losing the text would be worse
//! than a wrong box.

use serde_json::Value;
use uuid::Uuid;

use super::types::{OcrRegion, OcrWord};
use crate::geometry::Rect;

/// Placeholder geometry for items with no usable region
const PLACEHOLDER_RECT: Rect = Rect {
    left: 0,
    top: 0,
    width: 100,
    height: 30,
};

/// Closed set of shapes a raw OCR item can take
#[derive(Debug)]
enum RawShape {
    /// Quadrilateral corner list, not necessarily axis-aligned
    Quad(Vec<(f64, f64)>),
    /// Already-rectangular `{left, top, width, height}`
    Rectangle(Rect),
    /// No usable geometry
    Missing,
}

/// Normalize a list of raw OCR items into canonical regions
pub fn normalize_items(items: &[Value]) -> Vec<OcrRegion> {
    items.iter().map(normalize_item).collect()
}

/// Normalize a single raw OCR item
pub fn normalize_item(item: &Value) -> OcrRegion {
    // Legacy triplet form: [bbox, text, confidence]
    if let Some(arr) = item.as_array() {
        let shape = arr.first().map(classify_geometry).unwrap_or(RawShape::Missing);
        let text = arr.get(1).and_then(Value::as_str).unwrap_or("").to_string();
        let confidence = arr.get(2).and_then(Value::as_f64);

        return build_region(shape, text, confidence, None);
    }

    // Object form: quad under text_region/bbox, or an explicit rect
    let shape = item
        .get("text_region")
        .or_else(|| item.get("bbox"))
        .map(classify_geometry)
        .unwrap_or_else(|| classify_geometry(item));

    let text = item
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let confidence = item.get("confidence").and_then(Value::as_f64);
    let words = parse_words(item.get("words"));

    build_region(shape, text, confidence, words)
}

fn build_region(
    shape: RawShape,
    text: String,
    confidence: Option<f64>,
    words: Option<Vec<OcrWord>>,
) -> OcrRegion {
    let region = match shape {
        RawShape::Quad(points) => bounding_rect(&points),
        RawShape::Rectangle(rect) => rect,
        RawShape::Missing => PLACEHOLDER_RECT,
    };

    OcrRegion {
        id: Uuid::new_v4().to_string(),
        text,
        region,
        confidence,
        words,
    }
}

/// Classify the geometry carried by a value
fn classify_geometry(value: &Value) -> RawShape {
    // Four (or more) [x, y] corner pairs
    if let Some(arr) = value.as_array() {
        let points: Vec<(f64, f64)> = arr
            .iter()
            .filter_map(|p| {
                let pair = p.as_array()?;
                Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
            })
            .collect();

        if points.len() >= 4 {
            return RawShape::Quad(points);
        }
        return RawShape::Missing;
    }

    // Explicit rectangle
    if let Some(obj) = value.as_object() {
        let fields: Option<[f64; 4]> = (|| {
            Some([
                obj.get("left")?.as_f64()?,
                obj.get("top")?.as_f64()?,
                obj.get("width")?.as_f64()?,
                obj.get("height")?.as_f64()?,
            ])
        })();

        if let Some([left, top, width, height]) = fields {
            return RawShape::Rectangle(Rect {
                left: left.round() as i64,
                top: top.round() as i64,
                width: width.round() as i64,
                height: height.round() as i64,
            });
        }
    }

    RawShape::Missing
}

/// Axis-aligned bounding rectangle of a point set
fn bounding_rect(points: &[(f64, f64)]) -> Rect {
    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    Rect {
        left: min_x.round() as i64,
        top: min_y.round() as i64,
        width: (max_x - min_x).round() as i64,
        height: (max_y - min_y).round() as i64,
    }
}

fn parse_words(value: Option<&Value>) -> Option<Vec<OcrWord>> {
    let arr = value?.as_array()?;
    let words: Vec<OcrWord> = arr
        .iter()
        .filter_map(|w| {
            Some(OcrWord {
                text: w.get("text")?.as_str()?.to_string(),
                confidence: w.get("confidence").and_then(Value::as_f64),
            })
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words)
    }
}
