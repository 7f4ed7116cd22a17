pub trait VecExtensions<T> {
    fn remove_first_where<F>(&mut self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool;
}

impl<T> VecExtensions<T> for Vec<T> {
    fn remove_first_where<F>(&mut self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.iter()
            .position(predicate)
            .map(|index| self.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::VecExtensions;

    #[test]
    fn remove_first_where_should_only_remove_the_first_match() {
        let mut values = vec![1, 2, 3, 2];

        assert_eq!(values.remove_first_where(|&v| v == 2), Some(2));
        assert_eq!(values, vec![1, 3, 2]);
        assert_eq!(values.remove_first_where(|&v| v == 7), None);
    }
}
