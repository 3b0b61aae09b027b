use std::collections::{BTreeMap, BTreeSet};

use crate::error::{SpecError, OVERRIDE_KEYS};

/// Firing delay forced on a single instance
#[derive(Debug, Clone, PartialEq)]
pub enum DelayOverride {
    /// Same delay for every output
    Uniform(f64),
    /// Delay per output name; missing outputs use the element default
    PerOutput(BTreeMap<String, f64>),
}

/// Dwell time forced on a single instance
#[derive(Debug, Clone, PartialEq)]
pub enum DwellOverride {
    /// Replaces the dwell of every transition that has one
    Uniform(f64),
    /// Dwell per transition id
    PerTransition(BTreeMap<String, f64>),
}

/// Past constraints forced on a single instance
#[derive(Debug, Clone, PartialEq)]
pub enum PastOverride {
    /// Replaces the gap of every existing constraint; 0 disables them
    Uniform(f64),
    /// Constraints per transition id, replacing the declared ones
    PerTransition(BTreeMap<String, BTreeMap<String, f64>>),
}

/// Per-instance configuration of a cell
///
/// Applied when an [`ElementSpec`](super::ElementSpec) is built into an [`Element`](super::Element).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    /// Firing delay of the instance
    pub firing_delay: Option<DelayOverride>,
    /// Dwell times of the instance
    pub transition_time: Option<DwellOverride>,
    /// Erroneous transition ids, replacing the element's own list
    pub error_transitions: Option<BTreeSet<String>>,
    /// Past constraints of the instance
    pub past_constraints: Option<PastOverride>,
    /// Number of Josephson junctions
    pub jjs: Option<u32>,
}

/// Dynamically-typed override value, as given on the command line
#[derive(Debug, Clone, PartialEq)]
pub enum OverrideValue {
    /// Integer
    Integer(i64),
    /// Floating-point number
    Number(f64),
    /// Single word
    Text(String),
    /// List of words
    List(Vec<String>),
    /// Mapping from keys to numbers
    Map(BTreeMap<String, f64>),
}

impl OverrideValue {
    fn type_name(&self) -> &'static str {
        match self {
            OverrideValue::Integer(_) => "int",
            OverrideValue::Number(_) => "float",
            OverrideValue::Text(_) => "str",
            OverrideValue::List(_) => "list",
            OverrideValue::Map(_) => "dict",
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            OverrideValue::Integer(i) => Some(*i as f64),
            OverrideValue::Number(f) => Some(*f),
            _ => None,
        }
    }

    /// Parse a value from its textual form
    ///
    /// Integers and numbers are recognized as such; `k:v,k:v` is a map of numbers;
    /// `a,b` is a list; anything else is text.
    pub fn parse(s: &str) -> OverrideValue {
        let s = s.trim();
        if let Ok(i) = s.parse::<i64>() {
            return OverrideValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return OverrideValue::Number(f);
        }
        let parts: Vec<&str> = s
            .split(',')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() && parts.iter().all(|p| p.contains(':')) {
            let mut map = BTreeMap::new();
            let mut valid = true;
            for p in &parts {
                let (k, v) = p.split_once(':').unwrap_or((*p, ""));
                match v.trim().parse::<f64>() {
                    Ok(v) => {
                        map.insert(k.trim().to_string(), v);
                    }
                    Err(_) => valid = false,
                }
            }
            if valid {
                return OverrideValue::Map(map);
            }
        }
        if s.contains(',') {
            return OverrideValue::List(parts.iter().map(|p| p.to_string()).collect());
        }
        OverrideValue::Text(s.to_string())
    }
}

impl Overrides {
    /// No override
    pub fn new() -> Overrides {
        Overrides::default()
    }

    /// Return whether no override is set
    pub fn is_empty(&self) -> bool {
        *self == Overrides::default()
    }

    /// Force the firing delay of every output
    pub fn firing_delay(mut self, delay: f64) -> Self {
        self.firing_delay = Some(DelayOverride::Uniform(delay));
        self
    }

    /// Force the firing delay of one output
    pub fn firing_delay_for(mut self, output: &str, delay: f64) -> Self {
        let mut delays = match self.firing_delay.take() {
            Some(DelayOverride::PerOutput(m)) => m,
            _ => BTreeMap::new(),
        };
        delays.insert(output.to_string(), delay);
        self.firing_delay = Some(DelayOverride::PerOutput(delays));
        self
    }

    /// Force the dwell time of every transition using the element default dwell
    pub fn transition_time(mut self, time: f64) -> Self {
        self.transition_time = Some(DwellOverride::Uniform(time));
        self
    }

    /// Force the dwell time of one transition
    pub fn transition_time_for(mut self, id: &str, time: f64) -> Self {
        let mut times = match self.transition_time.take() {
            Some(DwellOverride::PerTransition(m)) => m,
            _ => BTreeMap::new(),
        };
        times.insert(id.to_string(), time);
        self.transition_time = Some(DwellOverride::PerTransition(times));
        self
    }

    /// Replace the set of erroneous transitions
    pub fn error_transitions(mut self, ids: &[&str]) -> Self {
        self.error_transitions = Some(ids.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Force the gap of every past constraint
    pub fn past_constraints(mut self, gap: f64) -> Self {
        self.past_constraints = Some(PastOverride::Uniform(gap));
        self
    }

    /// Replace the past constraints of one transition
    pub fn past_constraint_for(mut self, id: &str, input: &str, gap: f64) -> Self {
        let mut all = match self.past_constraints.take() {
            Some(PastOverride::PerTransition(m)) => m,
            _ => BTreeMap::new(),
        };
        all.entry(id.to_string())
            .or_default()
            .insert(input.to_string(), gap);
        self.past_constraints = Some(PastOverride::PerTransition(all));
        self
    }

    /// Set the number of Josephson junctions
    pub fn jjs(mut self, jjs: u32) -> Self {
        self.jjs = Some(jjs);
        self
    }

    /// Set an override from a key and a dynamically-typed value
    ///
    /// Past constraints given as a map use `id.input` keys.
    pub fn set(&mut self, key: &str, value: OverrideValue) -> Result<(), SpecError> {
        let invalid = |expected: &'static str| SpecError::InvalidOverrideType {
            key: key.to_string(),
            got: value.type_name(),
            expected,
        };
        match key {
            "jjs" => match value {
                OverrideValue::Integer(i) if i >= 0 => {
                    self.jjs = Some(i as u32);
                }
                _ => return Err(invalid("int")),
            },
            "firing_delay" => {
                if let Some(d) = value.as_number() {
                    self.firing_delay = Some(DelayOverride::Uniform(d));
                } else if let OverrideValue::Map(m) = &value {
                    self.firing_delay = Some(DelayOverride::PerOutput(m.clone()));
                } else {
                    return Err(invalid("float,int,dict"));
                }
            }
            "transition_time" => {
                if let Some(d) = value.as_number() {
                    self.transition_time = Some(DwellOverride::Uniform(d));
                } else if let OverrideValue::Map(m) = &value {
                    self.transition_time = Some(DwellOverride::PerTransition(m.clone()));
                } else {
                    return Err(invalid("float,int,dict"));
                }
            }
            "error_transitions" => match &value {
                OverrideValue::List(l) => {
                    self.error_transitions = Some(l.iter().cloned().collect());
                }
                OverrideValue::Text(t) => {
                    self.error_transitions = Some([t.clone()].into_iter().collect());
                }
                OverrideValue::Integer(i) => {
                    self.error_transitions = Some([i.to_string()].into_iter().collect());
                }
                _ => return Err(invalid("list,set")),
            },
            "past_constraints" => {
                if let Some(d) = value.as_number() {
                    self.past_constraints = Some(PastOverride::Uniform(d));
                } else if let OverrideValue::Map(m) = &value {
                    let mut all: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
                    for (k, v) in m {
                        let Some((id, input)) = k.split_once('.') else {
                            return Err(invalid("float,int,dict"));
                        };
                        all.entry(id.to_string())
                            .or_default()
                            .insert(input.to_string(), *v);
                    }
                    self.past_constraints = Some(PastOverride::PerTransition(all));
                } else {
                    return Err(invalid("float,int,dict"));
                }
            }
            _ => return Err(SpecError::UnknownOverride(key.to_string())),
        }
        Ok(())
    }

    /// Set an override from a `key=value` assignment
    pub fn parse_assignment(&mut self, assignment: &str) -> Result<(), SpecError> {
        let Some((key, value)) = assignment.split_once('=') else {
            return Err(SpecError::UnknownOverride(assignment.to_string()));
        };
        self.set(key.trim(), OverrideValue::parse(value))
    }

    /// Keys accepted by [`Overrides::set`]
    pub fn keys() -> &'static [&'static str] {
        &OVERRIDE_KEYS
    }
}
