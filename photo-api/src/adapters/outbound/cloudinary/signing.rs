use sha2::{Digest, Sha256};

use crate::domain::models::UploadTransform;

/// Parameters Cloudinary never includes in the string to sign.
const UNSIGNED_PARAMS: [&str; 5] = [
    "file",
    "api_key",
    "cloud_name",
    "resource_type",
    "signature_algorithm",
];

/// Builds the `key=value&...` string Cloudinary signs: sorted by key, with
/// empty values and unsigned parameters left out.
pub fn string_to_sign(params: &[(&str, String)]) -> String {
    let mut signed = params
        .iter()
        .filter(|(key, value)| !value.is_empty() && !UNSIGNED_PARAMS.contains(key))
        .collect::<Vec<_>>();
    signed.sort_by(|(a, _), (b, _)| a.cmp(b));

    signed
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// SHA-256 request signature, hex encoded.
pub fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(string_to_sign(params).as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Renders a transform as a transformation string, e.g. `w_500,h_500,c_fill,g_face`.
pub fn transformation(transform: &UploadTransform) -> String {
    let mut parts = vec![
        format!("w_{}", transform.width),
        format!("h_{}", transform.height),
        format!("c_{}", transform.crop),
    ];
    if let Some(gravity) = &transform.gravity {
        parts.push(format!("g_{gravity}"));
    }
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transform_matches_face_crop() {
        assert_eq!(
            transformation(&UploadTransform::default()),
            "w_500,h_500,c_fill,g_face"
        );
    }

    #[test]
    fn transform_without_gravity() {
        let transform = UploadTransform {
            width: 120,
            height: 80,
            crop: "thumb".to_string(),
            gravity: None,
        };
        assert_eq!(transformation(&transform), "w_120,h_80,c_thumb");
    }

    #[test]
    fn string_to_sign_is_sorted_and_skips_unsigned_params() {
        let params = [
            ("timestamp", "1315060510".to_string()),
            ("public_id", "sample_image".to_string()),
            ("api_key", "1234".to_string()),
            ("folder", String::new()),
            ("signature_algorithm", "sha256".to_string()),
        ];

        assert_eq!(
            string_to_sign(&params),
            "public_id=sample_image&timestamp=1315060510"
        );
    }

    #[test]
    fn signature_depends_on_secret() {
        let params = [("timestamp", "1315060510".to_string())];

        let first = sign(&params, "abcd");
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first, sign(&params, "abcd"));
        assert_ne!(first, sign(&params, "efgh"));
    }
}
