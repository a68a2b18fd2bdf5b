//! Friendly session names: `<adjective>-<security term>`.

use rand::seq::IndexedRandom;

const ADJECTIVES: &[&str] = &[
    "beautiful", "creative", "dangerous", "elegant", "fancy", "gorgeous", "handsome", "intelligent",
    "jolly", "kind", "lovely", "magnificent", "nice", "outstanding", "perfect", "quick", "reliable",
    "smart", "talented", "unique", "vibrant", "wonderful", "young", "zany", "amazing", "brave",
    "calm", "delightful", "eager", "faithful", "gentle", "happy", "incredible", "jovial", "keen",
    "lucky", "merry", "optimistic", "proud", "quiet", "scary", "thoughtful", "upbeat", "victorious",
    "witty", "zealous", "adorable", "brilliant", "charming", "daring", "fearless", "graceful",
    "honest", "lively", "modest", "silly",
];

const TERMS: &[&str] = &[
    "firewall", "xss", "sql-injection", "csrf", "dos", "botnet", "rsa", "aes", "sha", "hmac",
    "xtea", "twofish", "serpent", "dh", "ecc", "dsa", "pgp", "vpn", "tor", "dns", "tls", "ssl",
    "https", "ssh", "sftp", "snmp", "ldap", "kerberos", "oauth", "bcrypt", "scrypt", "argon2",
    "pbkdf2", "ransomware", "trojan", "rootkit", "keylogger", "adware", "spyware", "worm", "virus",
    "antivirus", "sandbox", "ids", "ips", "honeybot", "honeypot", "siem", "nids", "hids", "waf",
    "dast", "sast", "vulnerability", "exploit", "0day", "logjam", "heartbleed", "shellshock",
    "poodle", "spectre", "meltdown", "rowhammer", "sca", "padding", "oracle",
];

/// A random cybersecurity-themed session name such as `brave-firewall`.
pub fn generate_session_name() -> String {
    let mut rng = rand::rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or("brave");
    let term = TERMS.choose(&mut rng).copied().unwrap_or("firewall");
    format!("{adjective}-{term}")
}
