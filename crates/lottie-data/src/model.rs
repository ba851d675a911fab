use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LottieJson {
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    pub ip: f32,
    pub op: f32,
    pub fr: f32,
    pub w: u32,
    pub h: u32,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Layer {
    #[serde(default)]
    pub ty: u8,
    #[serde(default)]
    pub ind: Option<u32>,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default = "default_one")]
    pub sr: f32, // Time stretch
    #[serde(default)]
    pub ks: Transform,
    #[serde(default)]
    pub ao: Option<u8>, // Auto-orient along path
    #[serde(default)]
    pub ddd: Option<u8>, // 3D Layer Flag (0=2D, 1=3D)
    #[serde(default)]
    pub shapes: Option<Vec<Shape>>,
}

fn default_one() -> f32 {
    1.0
}

// Shapes

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "ty")]
pub enum Shape {
    #[serde(rename = "gr")]
    Group(GroupShape),
    #[serde(rename = "rc")]
    Rect(RectShape),
    #[serde(rename = "el")]
    Ellipse(EllipseShape),
    #[serde(rename = "sh")]
    Path(PathShape),
    #[serde(rename = "sr")]
    Polystar(PolystarShape),
    #[serde(rename = "tr")]
    Transform(TransformShape),
    #[serde(rename = "tm")]
    Trim(TrimShape),
    #[serde(rename = "rd")]
    RoundCorners(RoundCornersShape),
    #[serde(rename = "rp")]
    Repeater(RepeaterShape),
    // Paint items. Geometry evaluation has no use for their fields.
    #[serde(rename = "fl")]
    Fill,
    #[serde(rename = "st")]
    Stroke,
    #[serde(rename = "gf")]
    GradientFill,
    #[serde(rename = "gs")]
    GradientStroke,
    /// Unsupported items. Parsed so documents load, then skipped.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub it: Vec<Shape>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RectShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
    #[serde(default)]
    pub r: Property<f32>,
    #[serde(default)]
    pub d: Option<u8>, // 3 = counter-clockwise
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EllipseShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<Vec<f32>>,
    pub p: Property<Vec<f32>>,
    #[serde(default)]
    pub d: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub ks: Property<BezierPath>,
    #[serde(default)]
    pub d: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PolystarShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub p: Property<Vec<f32>>,
    pub or: Property<f32>,
    #[serde(default)]
    pub os: Property<f32>,
    #[serde(default)]
    pub r: Property<f32>,
    pub pt: Property<f32>,
    #[serde(default = "default_star")]
    pub sy: u8, // 1 = star, 2 = polygon
    #[serde(default)]
    pub ir: Option<Property<f32>>,
    #[serde(default)]
    pub is: Option<Property<f32>>,
    #[serde(default)]
    pub d: Option<u8>,
}

fn default_star() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransformShape {
    #[serde(flatten)]
    pub t: Transform,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TrimShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub s: Property<f32>,
    pub e: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default = "default_trim_mode")]
    pub m: u8, // 1 = simultaneously, 2 = individually
}

fn default_trim_mode() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoundCornersShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub r: Property<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RepeaterShape {
    #[serde(default)]
    pub nm: Option<String>,
    pub c: Property<f32>,
    #[serde(default)]
    pub o: Property<f32>,
    #[serde(default = "default_composite")]
    pub m: u8, // 1 = above, 2 = below
    #[serde(default)]
    pub tr: RepeaterTransform,
}

fn default_composite() -> u8 {
    1
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct RepeaterTransform {
    #[serde(flatten)]
    pub t: Transform,
    #[serde(default)]
    pub so: Property<f32>, // Start opacity
    #[serde(default)]
    pub eo: Property<f32>, // End opacity
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Transform {
    #[serde(default)]
    pub a: Property<Vec<f32>>, // Anchor
    #[serde(default)]
    pub p: PositionProperty,
    #[serde(default)]
    pub s: Property<Vec<f32>>, // Scale, percent
    #[serde(default, alias = "r")]
    pub rz: Property<f32>, // Rotation Z, degrees
    #[serde(default)]
    pub rx: Option<Property<f32>>,
    #[serde(default)]
    pub ry: Option<Property<f32>>,
    #[serde(default)]
    pub or: Option<Property<Vec<f32>>>, // Orientation, degrees
    #[serde(default)]
    pub o: Property<f32>, // Opacity, percent
    #[serde(default)]
    pub sk: Option<Property<f32>>, // Skew, degrees
    #[serde(default)]
    pub sa: Option<Property<f32>>, // Skew axis, degrees
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum PositionProperty {
    Split {
        x: Property<f32>,
        y: Property<f32>,
        #[serde(default)]
        z: Option<Property<f32>>,
    },
    Unified(Property<Vec<f32>>),
}

impl Default for PositionProperty {
    fn default() -> Self {
        PositionProperty::Unified(Property::default())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Property<T> {
    #[serde(default)]
    pub a: u8,
    #[serde(default)]
    #[serde(bound(deserialize = "T: DeserializeOwned"))]
    pub k: Value<T>,
    #[serde(default)]
    pub ix: Option<u32>,
    /// Expression source. Carried through, never evaluated.
    #[serde(default)]
    pub x: Option<String>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Property {
            a: 0,
            k: Value::Default,
            ix: None,
            x: None,
        }
    }
}

impl<T> Property<T> {
    pub fn fixed(value: T) -> Self {
        Property {
            k: Value::Static(value),
            ..Default::default()
        }
    }

    pub fn animated(keyframes: Vec<Keyframe<T>>) -> Self {
        Property {
            a: 1,
            k: Value::Animated(keyframes),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub enum Value<T> {
    Default,
    Static(T),
    Animated(Vec<Keyframe<T>>),
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Value<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let v = serde_json::Value::deserialize(deserializer)?;

        if v.is_null() {
            return Ok(Value::Default);
        }

        if let Ok(keyframes) = serde_json::from_value::<Vec<Keyframe<T>>>(v.clone()) {
            if !keyframes.is_empty() {
                return Ok(Value::Animated(keyframes));
            }
        }

        if let Ok(val) = serde_json::from_value::<T>(v.clone()) {
            return Ok(Value::Static(val));
        }

        if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
            if let Some(first) = vec.into_iter().next() {
                return Ok(Value::Static(first));
            }
        }

        Ok(Value::Default)
    }
}

impl<T> Default for Value<T> {
    fn default() -> Self {
        Value::Default
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Keyframe<T> {
    pub t: f32,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub s: Option<T>,
    #[serde(default, deserialize_with = "deserialize_keyframe_value")]
    pub e: Option<T>,
    #[serde(default)]
    pub i: Option<BezierTangent>,
    #[serde(default)]
    pub o: Option<BezierTangent>,
    #[serde(default)]
    pub to: Option<Vec<f32>>,
    #[serde(default)]
    pub ti: Option<Vec<f32>>,
    #[serde(default)]
    pub h: Option<u8>,
}

impl<T> Keyframe<T> {
    /// A keyframe at `t` starting at `s`, with every optional field unset.
    pub fn at(t: f32, s: T) -> Self {
        Keyframe {
            t,
            s: Some(s),
            e: None,
            i: None,
            o: None,
            to: None,
            ti: None,
            h: None,
        }
    }
}

fn deserialize_keyframe_value<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    if v.is_null() {
        return Ok(None);
    }

    if let Ok(val) = serde_json::from_value(v.clone()) {
        return Ok(Some(val));
    }

    if let Ok(vec) = serde_json::from_value::<Vec<T>>(v) {
        if let Some(first) = vec.into_iter().next() {
            return Ok(Some(first));
        }
    }

    Ok(None)
}

/// Keyframe easing handle. Matches both `{"x": 0.5, "y": 1}` and the
/// per-component form `{"x": [0.48, 0.2], "y": [1, 1]}`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BezierTangent {
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub x: Vec<f32>,
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub y: Vec<f32>,
}

impl BezierTangent {
    pub fn new(x: f32, y: f32) -> Self {
        BezierTangent {
            x: vec![x],
            y: vec![y],
        }
    }
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(f32),
        Many(Vec<f32>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

pub type Vec2 = [f32; 2];

/// Literal path. `i` and `o` are tangent offsets relative to their vertex.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BezierPath {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub i: Vec<Vec2>,
    #[serde(default)]
    pub o: Vec<Vec2>,
    #[serde(default)]
    pub v: Vec<Vec2>,
}
