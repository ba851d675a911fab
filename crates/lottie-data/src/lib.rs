// lottie-data: Serde structs for the property and shape encoding of Lottie JSON
pub mod model;

#[cfg(test)]
mod tests {
    use super::model::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_minimal() {
        let data = json!({
            "v": "5.5.2",
            "ip": 0,
            "op": 60,
            "fr": 60,
            "w": 500,
            "h": 500,
            "layers": []
        });
        let lottie: LottieJson = serde_json::from_value(data).unwrap();
        assert_eq!(lottie.w, 500);
        assert!(lottie.layers.is_empty());
    }

    #[test]
    fn test_deserialize_shape_layer() {
        let data = json!({
            "v": "5.5.2",
            "ip": 0, "op": 60, "fr": 60, "w": 100, "h": 100,
            "layers": [
                {
                    "ty": 4, // Shape Layer
                    "ind": 1,
                    "nm": "MyShape",
                    "ip": 0, "op": 60, "st": 0,
                    "ks": {},
                    "shapes": [
                        {
                            "ty": "rc",
                            "nm": "Rect",
                            "s": { "a": 0, "k": [100, 100] },
                            "p": { "a": 0, "k": [50, 50] },
                            "r": { "a": 0, "k": 0 }
                        },
                        {
                            "ty": "fl",
                            "c": { "a": 0, "k": [1, 0, 0, 1] },
                            "o": { "a": 0, "k": 100 }
                        }
                    ]
                }
            ]
        });
        let lottie: LottieJson = serde_json::from_value(data).unwrap();
        let layer = &lottie.layers[0];
        assert_eq!(layer.ty, 4);
        let shapes = layer.shapes.as_ref().expect("Expected shapes");
        assert_eq!(shapes.len(), 2);
        match &shapes[0] {
            Shape::Rect(rect) => assert_eq!(rect.nm.as_deref(), Some("Rect")),
            other => panic!("Expected Rect, got {:?}", other),
        }
        assert!(matches!(shapes[1], Shape::Fill));
    }

    #[test]
    fn test_paint_and_unknown_items() {
        let shapes: Vec<Shape> = serde_json::from_value(json!([
            { "ty": "st", "c": { "k": [0, 0, 0, 1] }, "w": { "k": 2 } },
            { "ty": "gf", "o": { "k": 100 } },
            { "ty": "gs", "o": { "k": 100 } },
            { "ty": "zz", "nm": "Mystery" }
        ]))
        .unwrap();
        assert!(matches!(shapes[0], Shape::Stroke));
        assert!(matches!(shapes[1], Shape::GradientFill));
        assert!(matches!(shapes[2], Shape::GradientStroke));
        assert!(matches!(shapes[3], Shape::Unknown));
    }

    #[test]
    fn test_easing_handles_accept_scalar_and_array() {
        let scalar: BezierTangent = serde_json::from_value(json!({ "x": 0.4, "y": 1 })).unwrap();
        assert_eq!(scalar, BezierTangent::new(0.4, 1.0));

        let per_axis: BezierTangent =
            serde_json::from_value(json!({ "x": [0.1, 0.2], "y": [0.3, 0.4] })).unwrap();
        assert_eq!(per_axis.x, vec![0.1, 0.2]);
        assert_eq!(per_axis.y, vec![0.3, 0.4]);
    }

    #[test]
    fn test_scalar_keyframes_unwrap_single_element_arrays() {
        let prop: Property<f32> = serde_json::from_value(json!({
            "a": 1,
            "k": [
                {
                    "t": 0,
                    "s": [0],
                    "o": { "x": [0.33], "y": [0] },
                    "i": { "x": [0.67], "y": [1] }
                },
                { "t": 10, "s": [100] }
            ]
        }))
        .unwrap();
        match prop.k {
            Value::Animated(kfs) => {
                assert_eq!(kfs.len(), 2);
                assert_eq!(kfs[0].s, Some(0.0));
                assert_eq!(kfs[1].s, Some(100.0));
                assert_eq!(kfs[0].o.as_ref().map(|o| o.x[0]), Some(0.33));
            }
            other => panic!("Expected keyframes, got {:?}", other),
        }
    }

    #[test]
    fn test_split_position() {
        let t: Transform = serde_json::from_value(json!({
            "p": { "s": true, "x": { "a": 0, "k": 10 }, "y": { "a": 0, "k": 20 } }
        }))
        .unwrap();
        assert!(matches!(t.p, PositionProperty::Split { .. }));

        let t: Transform = serde_json::from_value(json!({
            "p": { "a": 0, "k": [10, 20, 0] }
        }))
        .unwrap();
        match t.p {
            PositionProperty::Unified(p) => {
                assert!(matches!(p.k, Value::Static(ref v) if v == &vec![10.0, 20.0, 0.0]))
            }
            other => panic!("Expected unified position, got {:?}", other),
        }
    }
}
