//! Bundle up parameters and their values in a generic way.

// octree
use crate::core::pbrt::Float;

// see paramset.h

pub struct ParamSetItem<T> {
    pub name: String,
    pub values: Vec<T>,
    pub n_values: usize,
}

#[derive(Default)]
pub struct ParamSet {
    pub ints: Vec<ParamSetItem<i32>>,
    pub floats: Vec<ParamSetItem<Float>>,
}

impl ParamSet {
    pub fn add_float(&mut self, name: String, value: Float) {
        self.add_floats(name, vec![value]);
    }
    pub fn add_floats(&mut self, name: String, values: Vec<Float>) {
        let n_values: usize = values.len();
        self.floats.push(ParamSetItem::<Float> {
            name,
            values,
            n_values,
        });
    }
    pub fn add_int(&mut self, name: String, value: i32) {
        self.add_ints(name, vec![value]);
    }
    pub fn add_ints(&mut self, name: String, values: Vec<i32>) {
        let n_values: usize = values.len();
        self.ints.push(ParamSetItem::<i32> {
            name,
            values,
            n_values,
        });
    }
    pub fn find_one_float(&self, name: &str, d: Float) -> Float {
        lookup_one(&self.floats, name, d)
    }
    pub fn find_one_int(&self, name: &str, d: i32) -> i32 {
        lookup_one(&self.ints, name, d)
    }
}

/// Replaces a macro on the C++ side.
pub fn lookup_one<T>(vec: &[ParamSetItem<T>], name: &str, d: T) -> T
where
    T: Clone,
{
    for v in vec {
        if v.name == name && v.n_values == 1_usize {
            return v.values[0].clone();
        }
    }
    d
}
