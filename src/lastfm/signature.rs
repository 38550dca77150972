use std::collections::BTreeMap;

/// Parameters excluded from the signature base string.
const UNSIGNED_PARAMS: [&str; 3] = ["api_sig", "format", "callback"];

/// Computes the Last.fm `api_sig` for a set of request parameters.
///
/// Parameter names are sorted, each `name + value` pair is concatenated with
/// no separator, the shared secret is appended and the result is MD5 hashed.
/// MD5 is mandated by the provider.
pub fn sign<'a, I>(params: I, secret: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let sorted: BTreeMap<&str, &str> = params
        .into_iter()
        .filter(|(name, _)| !UNSIGNED_PARAMS.contains(name))
        .collect();

    let mut base = String::new();
    for (name, value) in sorted {
        base.push_str(name);
        base.push_str(value);
    }
    base.push_str(secret);

    format!("{:x}", md5::compute(base.as_bytes()))
}
