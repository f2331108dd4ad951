use std::collections::HashMap;

use blocks::value::Value;

/// Parameter bindings for one function invocation.
#[derive(Debug, Clone)]
pub struct Frame {
    function: String,
    parameters: HashMap<String, Value>,
}

impl Frame {
    pub fn new(function: impl Into<String>, bindings: impl IntoIterator<Item = (String, Value)>) -> Self {
        Frame {
            function: function.into(),
            parameters: bindings.into_iter().collect(),
        }
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Call frames plus the current nesting depth of the walk.
/// Parameters are only visible inside the frame that bound them.
#[derive(Debug, Default)]
pub struct Environment {
    frames: Vec<Frame>,
    depth: usize,
}

impl Environment {
    pub fn new() -> Self {
        Environment::default()
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn in_function(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Number of calls currently active.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_function(&self) -> Option<&str> {
        self.frames.last().map(Frame::function)
    }

    /// Look up a parameter in the innermost frame.
    pub fn get_parameter(&self, name: &str) -> Option<&Value> {
        self.frames.last()?.get_parameter(name)
    }

    /// Descend one level. Returns false once `limit` is reached.
    pub fn enter(&mut self, limit: usize) -> bool {
        if self.depth >= limit {
            return false;
        }
        self.depth += 1;
        true
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Forget frames and depth left over from an earlier run.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_resolve_in_innermost_frame_only() {
        let mut env = Environment::new();
        assert!(!env.in_function());
        env.push_frame(Frame::new("outer", [("a".to_string(), Value::Number(1.0))]));
        env.push_frame(Frame::new("inner", [("b".to_string(), Value::Number(2.0))]));
        assert_eq!(env.current_function(), Some("inner"));
        assert_eq!(env.call_depth(), 2);
        assert_eq!(env.get_parameter("b"), Some(&Value::Number(2.0)));
        assert!(env.get_parameter("a").is_none());

        env.pop_frame();
        assert_eq!(env.get_parameter("a"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn depth_is_bounded() {
        let mut env = Environment::new();
        assert!(env.enter(2));
        assert!(env.enter(2));
        assert!(!env.enter(2));
        assert_eq!(env.depth(), 2);
        env.leave();
        assert!(env.enter(2));
        env.reset();
        assert_eq!(env.depth(), 0);
    }
}
