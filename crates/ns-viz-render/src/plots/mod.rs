pub mod hypotest;
