use std::{
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

use kairos_publisher::{
    codec::encode_records,
    config::{ConfigMap, ConfigValue, HOST, LOG_LEVEL, PORT, USE_DYNAMIC_NAMESPACE},
    record::Tags,
    MetricRecord, MetricValue, Namespace, NamespaceSegment, Publisher, BINARY_CONTENT_TYPE,
};

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".into());
    let port: i64 = args.next().as_deref().unwrap_or("8080").parse()?;

    let config = ConfigMap::from([
        (HOST.to_owned(), ConfigValue::from(host)),
        (PORT.to_owned(), ConfigValue::from(port)),
        (USE_DYNAMIC_NAMESPACE.to_owned(), ConfigValue::from(true)),
        (LOG_LEVEL.to_owned(), ConfigValue::from("debug")),
    ]);

    let mut sys = sysinfo::System::new_all();
    // usage is a delta between two refreshes
    thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    sys.refresh_cpu_usage();

    let timestamp = u64::try_from(SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos())?;
    let mut records = vec![MetricRecord {
        namespace: Namespace::from_literals(["demo", "cpu", "usage"]),
        tags: Tags::new(),
        value: MetricValue::Float(f64::from(sys.global_cpu_usage())),
        timestamp,
    }];
    for (i, cpu) in sys.cpus().iter().enumerate() {
        records.push(MetricRecord {
            namespace: Namespace::new(vec![
                NamespaceSegment::literal("demo"),
                NamespaceSegment::literal("cpu"),
                NamespaceSegment::dynamic("core", i.to_string()),
                NamespaceSegment::literal("usage"),
            ]),
            tags: Tags::new(),
            value: MetricValue::Float(f64::from(cpu.cpu_usage())),
            timestamp,
        });
    }

    let content = encode_records(&records)?;
    Publisher::new().publish(BINARY_CONTENT_TYPE, &content, &config)?;
    println!("published {} points", records.len());
    Ok(())
}
