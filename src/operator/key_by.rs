use crate::errors::OperatorError;
use crate::function::{FieldKey, KeySelector};
use crate::message::Record;
use crate::operator::{KeyByConfig, OperatorKind};
use crate::traits::{Emitter, Operator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PartitionStrategy {
    Hash,
    RoundRobin,
}

/// Tags every message with its `key` and `partition` metadata.
pub struct KeyByOperator {
    name: String,
    selector: Box<dyn KeySelector>,
    strategy: PartitionStrategy,
    partitions: usize,
    next_partition: usize,
}

impl KeyByOperator {
    /// Uses `selector` when given, otherwise the configured metadata field.
    pub fn new(
        name: impl Into<String>,
        selector: Option<Box<dyn KeySelector>>,
        config: &KeyByConfig,
    ) -> Result<Self, OperatorError> {
        let name = name.into();
        let strategy = match config.strategy.as_str() {
            "hash" => PartitionStrategy::Hash,
            "round_robin" => PartitionStrategy::RoundRobin,
            other => {
                return Err(OperatorError::invalid_config(
                    &name,
                    format!("unknown partition strategy '{other}'"),
                ))
            }
        };
        if config.partitions == 0 {
            return Err(OperatorError::invalid_config(&name, "partitions must be at least 1"));
        }
        let selector = match (selector, &config.field) {
            (Some(selector), _) => selector,
            (None, Some(field)) => Box::new(FieldKey::new(field.clone())) as Box<dyn KeySelector>,
            (None, None) => {
                return Err(OperatorError::invalid_config(
                    &name,
                    "requires a key selector or a key field",
                ))
            }
        };

        Ok(Self {
            name,
            selector,
            strategy,
            partitions: config.partitions,
            next_partition: 0,
        })
    }

    fn partition_for(&mut self, key: &str) -> usize {
        match self.strategy {
            PartitionStrategy::Hash => (stable_hash(key) % self.partitions as u64) as usize,
            PartitionStrategy::RoundRobin => {
                let partition = self.next_partition;
                self.next_partition = (self.next_partition + 1) % self.partitions;
                partition
            }
        }
    }
}

/// FNV-1a; identical across runs and platforms.
fn stable_hash(key: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    key.bytes()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(PRIME))
}

impl Operator for KeyByOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::KeyBy
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, mut input: Record, out: &mut Emitter) -> Result<bool, OperatorError> {
        for i in 0..input.len() {
            let key = self.selector.key(&input.messages()[i]);
            let partition = self.partition_for(&key);
            let message = &mut input.messages_mut()[i];
            message.insert_metadata("key", key);
            message.insert_metadata("partition", partition.to_string());
        }
        let emitted = !input.is_empty();
        out.emit(input);
        Ok(emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnKey;
    use crate::message::Message;
    use crate::metrics::UidGenerator;

    fn run(op: &mut KeyByOperator, messages: Vec<Message>) -> Vec<Message> {
        let mut out = Emitter::new();
        op.process(Record::new(messages), &mut out).unwrap();
        out.into_records().into_iter().flatten().collect()
    }

    #[test]
    fn test_hash_partition_is_stable_per_key() {
        let uids = UidGenerator::new();
        let config = KeyByConfig {
            partitions: 8,
            field: Some("user".into()),
            ..KeyByConfig::default()
        };
        let mut op = KeyByOperator::new("by_user", None, &config).unwrap();
        let keyed = run(
            &mut op,
            vec![
                uids.text("a").with_metadata("user", "ann"),
                uids.text("b").with_metadata("user", "bob"),
                uids.text("c").with_metadata("user", "ann"),
            ],
        );

        assert_eq!(keyed[0].metadata_value("key"), Some("ann"));
        assert_eq!(
            keyed[0].metadata_value("partition"),
            keyed[2].metadata_value("partition")
        );
        let partition: usize = keyed[1].metadata_value("partition").unwrap().parse().unwrap();
        assert!(partition < 8);
    }

    #[test]
    fn test_round_robin_cycles_partitions() {
        let uids = UidGenerator::new();
        let config = KeyByConfig {
            strategy: "round_robin".into(),
            partitions: 2,
            field: None,
        };
        let selector: Box<dyn KeySelector> = Box::new(FnKey::new(|m: &Message| {
            m.text().unwrap_or_default().to_string()
        }));
        let mut op = KeyByOperator::new("rr", Some(selector), &config).unwrap();
        let keyed = run(&mut op, vec![uids.text("x"), uids.text("y"), uids.text("z")]);

        let partitions: Vec<_> = keyed
            .iter()
            .map(|m| m.metadata_value("partition").unwrap().to_string())
            .collect();
        assert_eq!(partitions, ["0", "1", "0"]);
        assert_eq!(keyed[1].metadata_value("key"), Some("y"));
    }

    #[test]
    fn test_invalid_configurations_rejected() {
        let no_key = KeyByConfig::default();
        assert!(matches!(
            KeyByOperator::new("k", None, &no_key),
            Err(OperatorError::InvalidConfiguration { .. })
        ));

        let zero = KeyByConfig {
            partitions: 0,
            field: Some("f".into()),
            ..KeyByConfig::default()
        };
        assert!(KeyByOperator::new("k", None, &zero).is_err());

        let unknown = KeyByConfig {
            strategy: "range".into(),
            field: Some("f".into()),
            ..KeyByConfig::default()
        };
        assert!(KeyByOperator::new("k", None, &unknown).is_err());
    }
}
